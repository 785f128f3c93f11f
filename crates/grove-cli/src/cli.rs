use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "grove",
    about = "Grove — seed forest console",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Session home path, where `~` points
    #[arg(long, global = true, default_value = "/")]
    pub home: String,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Execute command lines against the demo forest and exit
    Run(RunArgs),
    /// Interactive console: one command line per stdin line
    Shell(ShellArgs),
    /// Print the layout descriptor of a demo forest tree
    Layout(LayoutArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Command lines, e.g. `gv /Symbs` or `ss,Qty=500 /Symbs/2330`
    pub lines: Vec<String>,
}

#[derive(Args)]
pub struct ShellArgs {}

#[derive(Args)]
pub struct LayoutArgs {
    #[arg(default_value = "/Symbs")]
    pub path: String,
}
