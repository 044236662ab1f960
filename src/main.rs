use clap::Parser;
use miette::Result;

use epochal::cli::commands::{completions, family, init};
use epochal::cli::{init_telemetry, Cli, Commands};
use epochal::entities::{JobFamily, JobFamilyGroup, JobLevel, JobRole, OrgUnit, Position};

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    init_telemetry(&cli.global);
    let global = &cli.global;

    match cli.command {
        Commands::Init(args) => init::run(args),
        Commands::Org(cmd) => family::run::<OrgUnit>(cmd, global),
        Commands::Group(cmd) => family::run::<JobFamilyGroup>(cmd, global),
        Commands::Family(cmd) => family::run::<JobFamily>(cmd, global),
        Commands::Role(cmd) => family::run::<JobRole>(cmd, global),
        Commands::Level(cmd) => family::run::<JobLevel>(cmd, global),
        Commands::Pos(cmd) => family::run::<Position>(cmd, global),
        Commands::Completions(args) => completions::run(args),
    }
}
