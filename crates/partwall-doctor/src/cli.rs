use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{
    AssignLabelsArgs, CheckArgs, Context, FindSlotArgs, ListTemplatesArgs, PlanTemplateArgs,
    ShrinkImpactArgs, ValidateArgs, run_assign_labels, run_check, run_find_slot,
    run_list_templates, run_plan_template, run_shrink_impact, run_validate,
};
use crate::error::Result;

#[derive(Debug, Parser)]
#[command(
    name = "partwall-doctor",
    about = "Inspect partwall grid snapshots and layout templates",
    version
)]
pub struct Cli {
    /// Emit machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Inventory config file (drawer-size catalog); defaults to $PARTWALL_CONFIG.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report every invariant violation in a snapshot.
    Check(CheckArgs),

    /// Check one candidate region against a snapshot.
    Validate(ValidateArgs),

    /// Find the first free region of a given size.
    #[command(name = "find-slot")]
    FindSlot(FindSlotArgs),

    /// List occupants a smaller grid would leave out of bounds.
    #[command(name = "shrink-impact")]
    ShrinkImpact(ShrinkImpactArgs),

    /// Resolve and validate a layout template.
    #[command(name = "plan-template")]
    PlanTemplate(PlanTemplateArgs),

    /// List layout templates with grid size and drawer count.
    #[command(name = "list-templates")]
    ListTemplates(ListTemplatesArgs),

    /// Match labels detected in a case photo to a template's drawers.
    #[command(name = "assign-labels")]
    AssignLabels(AssignLabelsArgs),
}

pub fn run(cli: Cli) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with_output(cli, &mut out)
}

pub fn run_with_output(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let ctx = Context {
        json: cli.json,
        config: cli.config,
    };
    match cli.command {
        Commands::Check(args) => run_check(args, &ctx, out),
        Commands::Validate(args) => run_validate(args, &ctx, out),
        Commands::FindSlot(args) => run_find_slot(args, &ctx, out),
        Commands::ShrinkImpact(args) => run_shrink_impact(args, &ctx, out),
        Commands::PlanTemplate(args) => run_plan_template(args, &ctx, out),
        Commands::ListTemplates(args) => run_list_templates(args, &ctx, out),
        Commands::AssignLabels(args) => run_assign_labels(args, &ctx, out),
    }
}
