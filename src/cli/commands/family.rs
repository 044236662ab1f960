//! Version commands shared by every entity family
//!
//! `epochal org ...`, `epochal role ...`, `epochal pos ...` and the rest all
//! parse into [`FamilyCommands`]; [`run`] is instantiated once per payload type.

use chrono::NaiveDate;
use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{IntoDiagnostic, Result};

use crate::cli::output::{print_nodes, print_value, print_version, print_versions};
use crate::cli::payload::{CliPayload, PayloadArgs};
use crate::cli::workspace::{self, diag};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Status;
use crate::core::identity::{BusinessCode, RecordId};
use crate::core::service::{RequestContext, TemporalService};
use crate::core::timeline::Violation;
use crate::core::version::Timeline;

#[derive(Subcommand, Debug)]
pub enum FamilyCommands {
    /// Add a version effective from a date
    Add(AddArgs),

    /// Change fields of one version without moving it in time
    Update(UpdateArgs),

    /// Soft-delete one version and close the gap it leaves
    Delete(DeleteArgs),

    /// Move one version to a new effective date
    Move(MoveArgs),

    /// Make inactive from a date
    Suspend(TransitionArgs),

    /// Make active from a date
    Activate(TransitionArgs),

    /// Move to any status allowed for this family
    Status(StatusArgs),

    /// Show the dated versions of a business code
    Timeline(TimelineArgs),

    /// Show the current version (or the one in effect on --at)
    Show(ShowArgs),

    /// List the current version of every business code
    List,

    /// Re-derive end dates and the current flag of a business code
    Recalc(CodeArgs),

    /// Check stored timelines without changing them
    Verify(VerifyArgs),

    /// Show the current tree below a business code
    Tree(TreeArgs),

    /// Rewrite the paths of every descendant from its parent's current snapshot
    Refresh(CodeArgs),

    /// Preview the level and paths a node would get under a parent
    Hierarchy(HierarchyArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Business code
    pub code: BusinessCode,

    /// First day this version is in effect (default: today)
    #[arg(long, short = 'e')]
    pub effective: Option<NaiveDate>,

    #[command(flatten)]
    pub payload: PayloadArgs,

    /// Why this version exists
    #[arg(long, short = 'r')]
    pub reason: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Record id of the version to change
    pub record_id: RecordId,

    #[command(flatten)]
    pub payload: PayloadArgs,

    #[arg(long, short = 'r')]
    pub reason: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Record id of the version to delete
    pub record_id: RecordId,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct MoveArgs {
    /// Record id of the version to move
    pub record_id: RecordId,

    /// New effective date
    pub new_date: NaiveDate,

    #[arg(long, short = 'r')]
    pub reason: String,
}

#[derive(clap::Args, Debug)]
pub struct TransitionArgs {
    /// Business code
    pub code: BusinessCode,

    /// First day of the new status (default: today)
    #[arg(long, short = 'e')]
    pub effective: Option<NaiveDate>,

    #[arg(long, short = 'r')]
    pub reason: String,
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Business code
    pub code: BusinessCode,

    /// Target status (ACTIVE, INACTIVE, and for positions PLANNED, VACANT, FILLED, FROZEN)
    pub status: Status,

    #[arg(long, short = 'e')]
    pub effective: Option<NaiveDate>,

    #[arg(long, short = 'r')]
    pub reason: String,
}

#[derive(clap::Args, Debug)]
pub struct TimelineArgs {
    /// Business code
    pub code: BusinessCode,

    /// Include deleted versions
    #[arg(long, short = 'a')]
    pub all: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Business code
    pub code: BusinessCode,

    /// Show the version in effect on this date instead of the current one
    #[arg(long)]
    pub at: Option<NaiveDate>,
}

#[derive(clap::Args, Debug)]
pub struct CodeArgs {
    /// Business code
    pub code: BusinessCode,
}

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    /// Business code (default: every code of the family)
    pub code: Option<BusinessCode>,
}

#[derive(clap::Args, Debug)]
pub struct TreeArgs {
    /// Root business code
    pub code: BusinessCode,

    /// Levels below the root to include
    #[arg(long)]
    pub depth: Option<u32>,
}

#[derive(clap::Args, Debug)]
pub struct HierarchyArgs {
    /// Business code of the node
    pub code: BusinessCode,

    /// Parent business code
    #[arg(long, short = 'p')]
    pub parent: Option<String>,

    /// Display name
    #[arg(long, short = 'n')]
    pub name: String,
}

pub fn run<P: CliPayload>(cmd: FamilyCommands, global: &GlobalOpts) -> Result<()> {
    let (mut service, ctx) = workspace::open(global)?;
    let format = global.format;

    match cmd {
        FamilyCommands::Add(args) => run_add::<P>(&mut service, &ctx, args, format),
        FamilyCommands::Update(args) => run_update::<P>(&mut service, &ctx, args, format),
        FamilyCommands::Delete(args) => run_delete::<P>(&mut service, &ctx, args, format),
        FamilyCommands::Move(args) => {
            let timeline = service
                .move_effective_date::<P>(&ctx, args.record_id, args.new_date, &args.reason)
                .map_err(diag)?;
            report_timeline(&timeline, format, "Moved", &args.record_id.to_string())
        }
        FamilyCommands::Suspend(args) => {
            let date = args.effective.unwrap_or_else(|| service.today());
            let timeline = service
                .suspend::<P>(&ctx, &args.code, date, &args.reason)
                .map_err(diag)?;
            report_timeline(&timeline, format, "Suspended", args.code.as_str())
        }
        FamilyCommands::Activate(args) => {
            let date = args.effective.unwrap_or_else(|| service.today());
            let timeline = service
                .activate::<P>(&ctx, &args.code, date, &args.reason)
                .map_err(diag)?;
            report_timeline(&timeline, format, "Activated", args.code.as_str())
        }
        FamilyCommands::Status(args) => {
            let date = args.effective.unwrap_or_else(|| service.today());
            let timeline = service
                .change_status::<P>(&ctx, &args.code, args.status, date, &args.reason)
                .map_err(diag)?;
            let verb = format!("Set {} to", args.status);
            report_timeline(&timeline, format, &verb, args.code.as_str())
        }
        FamilyCommands::Timeline(args) => {
            if args.all {
                let history = service.history::<P>(&ctx, &args.code).map_err(diag)?;
                print_versions(&history, format, "version")
            } else {
                let timeline = service.timeline::<P>(&ctx, &args.code).map_err(diag)?;
                print_versions(timeline.versions(), format, "version")
            }
        }
        FamilyCommands::Show(args) => {
            let found = match args.at {
                Some(date) => service.as_of::<P>(&ctx, &args.code, date),
                None => service.current::<P>(&ctx, &args.code),
            }
            .map_err(diag)?;
            match found {
                Some(version) => print_version(&version, format),
                None => Err(miette::miette!(
                    "[RECORD_NOT_FOUND] no {} version of {} in effect{}",
                    P::FAMILY,
                    args.code,
                    args.at.map(|d| format!(" on {}", d)).unwrap_or_default()
                )),
            }
        }
        FamilyCommands::List => {
            let versions = service.list::<P>(&ctx).map_err(diag)?;
            print_versions(&versions, format, &P::FAMILY.to_string())
        }
        FamilyCommands::Recalc(args) => {
            let timeline = service.recalculate::<P>(&ctx, &args.code).map_err(diag)?;
            report_timeline(&timeline, format, "Recalculated", args.code.as_str())
        }
        FamilyCommands::Verify(args) => run_verify::<P>(&service, &ctx, args),
        FamilyCommands::Tree(args) => {
            let nodes = service
                .subtree(&ctx, P::FAMILY, &args.code, args.depth)
                .map_err(diag)?;
            print_nodes(&nodes, format)
        }
        FamilyCommands::Refresh(args) => {
            let count = service
                .refresh_descendants(&ctx, P::FAMILY, &args.code)
                .map_err(diag)?;
            println!(
                "{} Refreshed {} descendant(s) of {}",
                style("✓").green(),
                style(count).cyan(),
                style(&args.code).cyan()
            );
            Ok(())
        }
        FamilyCommands::Hierarchy(args) => {
            let hierarchy = service
                .compute_hierarchy(
                    &ctx,
                    P::FAMILY,
                    &args.code,
                    args.parent.as_deref(),
                    &args.name,
                )
                .map_err(diag)?;
            print_value(&hierarchy, format)
        }
    }
}

fn run_add<P: CliPayload>(
    service: &mut TemporalService,
    ctx: &RequestContext,
    args: AddArgs,
    format: OutputFormat,
) -> Result<()> {
    let payload = P::from_args(&args.payload).map_err(|e| miette::miette!("{}", e))?;
    let date = args.effective.unwrap_or_else(|| service.today());

    let version = service
        .insert_version(ctx, &args.code, payload, date, args.reason.as_deref())
        .map_err(diag)?;

    if format == OutputFormat::Auto {
        println!(
            "{} Added {} {} effective {}",
            style("✓").green(),
            P::FAMILY,
            style(&version.code).cyan(),
            style(version.effective_date).yellow()
        );
        println!("   {}", style(version.record_id).dim());
        println!("   {}", style(&version.hierarchy.name_path).dim());
        Ok(())
    } else {
        print_version(&version, format)
    }
}

fn run_update<P: CliPayload>(
    service: &mut TemporalService,
    ctx: &RequestContext,
    args: UpdateArgs,
    format: OutputFormat,
) -> Result<()> {
    let existing = service.version::<P>(ctx, args.record_id).map_err(diag)?;
    let mut payload = existing.payload;
    payload
        .apply_args(&args.payload)
        .map_err(|e| miette::miette!("{}", e))?;

    let version = service
        .update_fields(ctx, args.record_id, payload, args.reason.as_deref())
        .map_err(diag)?;

    if format == OutputFormat::Auto {
        println!(
            "{} Updated {} {} version {}",
            style("✓").green(),
            P::FAMILY,
            style(&version.code).cyan(),
            style(version.record_id).dim()
        );
        Ok(())
    } else {
        print_version(&version, format)
    }
}

fn run_delete<P: CliPayload>(
    service: &mut TemporalService,
    ctx: &RequestContext,
    args: DeleteArgs,
    format: OutputFormat,
) -> Result<()> {
    let target = service.version::<P>(ctx, args.record_id).map_err(diag)?;

    if !args.yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Delete {} {} version effective {}?",
                P::FAMILY,
                target.code,
                target.effective_date
            ))
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let timeline = service
        .delete_version::<P>(ctx, args.record_id)
        .map_err(diag)?;
    report_timeline(&timeline, format, "Deleted version of", target.code.as_str())
}

fn run_verify<P: CliPayload>(
    service: &TemporalService,
    ctx: &RequestContext,
    args: VerifyArgs,
) -> Result<()> {
    let codes = match args.code {
        Some(code) => vec![code],
        None => service.codes(ctx, P::FAMILY).map_err(diag)?,
    };

    let mut failing: Vec<(BusinessCode, Vec<Violation>)> = Vec::new();
    for code in codes.iter() {
        let violations = service.verify(ctx, P::FAMILY, code).map_err(diag)?;
        if !violations.is_empty() {
            failing.push((code.clone(), violations));
        }
    }

    if failing.is_empty() {
        println!(
            "{} {} timeline(s) consistent",
            style("✓").green(),
            style(codes.len()).cyan()
        );
        return Ok(());
    }

    for (code, violations) in &failing {
        println!("{} {}", style("✗").red(), style(code).cyan());
        for violation in violations {
            println!("   {}", violation);
        }
    }
    Err(miette::miette!(
        "{} of {} timeline(s) have violations (run `recalc` to repair)",
        failing.len(),
        codes.len()
    ))
}

fn report_timeline<P: CliPayload>(
    timeline: &Timeline<P>,
    format: OutputFormat,
    verb: &str,
    subject: &str,
) -> Result<()> {
    if format != OutputFormat::Auto {
        return print_versions(timeline.versions(), format, "version");
    }
    println!(
        "{} {} {} {}",
        style("✓").green(),
        verb,
        P::FAMILY,
        style(subject).cyan()
    );
    print_versions(timeline.versions(), OutputFormat::Table, "version")
}
