use std::io::{self, BufRead, Write};

use colored::Colorize;

use grove_acl::AclConfig;
use grove_session::{Outcome, Payload, Visitor};
use grove_tree::GridViewResult;

use crate::cli::*;
use crate::demo;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = AclConfig::new("/");
    config.set_admin_mode();
    config.home = cli.home.clone();
    let forest = demo::forest().map_err(|e| anyhow::anyhow!("demo forest: {e}"))?;
    let mut visitor =
        Visitor::new(forest, config).map_err(|e| anyhow::anyhow!("session: {e}"))?;

    match cli.command {
        Command::Run(args) => cmd_run(&mut visitor, &args, &cli.format),
        Command::Shell(_) => cmd_shell(&mut visitor, &cli.format),
        Command::Layout(args) => {
            let out = visitor.execute(&format!("pl {}", args.path));
            print_outcome(&out, &cli.format)
        }
    }
}

fn cmd_run(visitor: &mut Visitor, args: &RunArgs, format: &OutputFormat) -> anyhow::Result<()> {
    if args.lines.is_empty() {
        anyhow::bail!("run needs at least one command line");
    }
    for line in &args.lines {
        let out = visitor.execute(line);
        print_outcome(&out, format)?;
    }
    Ok(())
}

fn cmd_shell(visitor: &mut Visitor, format: &OutputFormat) -> anyhow::Result<()> {
    println!(
        "Grove console. Commands: ss ps rs gv gv+ pl, or a path to navigate. {} to leave.",
        "exit".bold()
    );
    let stdin = io::stdin();
    loop {
        print!("{}{} ", visitor.curr().cyan(), ">".bold());
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        let out = visitor.execute(line);
        print_outcome(&out, format)?;
    }
    Ok(())
}

fn print_outcome(out: &Outcome, format: &OutputFormat) -> anyhow::Result<()> {
    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(out)?);
        return Ok(());
    }

    if !out.is_ok() {
        let at = match out.path_offset {
            Some(pos) => format!(" @{pos}"),
            None => String::new(),
        };
        println!("{} {}{}: {}", "✗".red().bold(), out.code, at.dimmed(), out.message);
        return Ok(());
    }

    match &out.payload {
        Payload::None => println!("{} {}", "✓".green().bold(), out.code),
        Payload::Text(text) => {
            if text.is_empty() {
                println!("{} {}", "✓".green().bold(), out.code);
            } else {
                print!("{}", text);
                if !text.ends_with('\n') {
                    println!();
                }
            }
        }
        Payload::Grid(grid) => {
            for row in grid.grid.split('\n') {
                println!("{row}");
            }
            println!("{}", grid_footer(grid).dimmed());
        }
        Payload::Layout(desc) => println!("{}", serde_json::to_string_pretty(desc)?),
    }
    Ok(())
}

fn grid_footer(grid: &GridViewResult) -> String {
    let size = grid
        .container_size
        .map_or_else(|| "?".to_string(), |n| n.to_string());
    let end = if grid.at_end() { ", end" } else { "" };
    format!("({} rows of {size}{end})", grid.row_count)
}
