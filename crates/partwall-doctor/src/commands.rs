use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use partwall_grid::{
    DetectedLabel, DrawerSizeCatalog, GridSnapshot, LayoutTemplate, OccupantId, PixelBounds,
    Region, find_first_fit, find_template_by_name, impact_of_grid_shrink, summarize_templates,
    validate,
};
use partwall_inventory::InventoryConfig;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::error::{DoctorError, Result};

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub json: bool,
    pub config: Option<PathBuf>,
}

impl Context {
    fn drawer_sizes(&self) -> Result<DrawerSizeCatalog> {
        let config = match &self.config {
            Some(path) => InventoryConfig::load(path)?,
            None => InventoryConfig::from_env()?,
        };
        Ok(config.drawer_sizes)
    }

    fn emit(&self, out: &mut dyn Write, value: serde_json::Value, text: &str) -> Result<()> {
        if self.json {
            writeln!(out, "{value:#}")?;
        } else {
            writeln!(out, "{text}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Grid snapshot JSON file.
    pub snapshot: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct ValidateArgs {
    /// Grid snapshot JSON file.
    pub snapshot: PathBuf,

    #[arg(long)]
    pub column: u16,

    #[arg(long)]
    pub row: u16,

    #[arg(long)]
    pub width: u16,

    #[arg(long)]
    pub height: u16,

    /// Occupant being moved or resized; ignored in the collision test.
    #[arg(long)]
    pub excluding: Option<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct FindSlotArgs {
    /// Grid snapshot JSON file.
    pub snapshot: PathBuf,

    #[arg(long)]
    pub width: u16,

    #[arg(long)]
    pub height: u16,
}

#[derive(Debug, Clone, Args)]
pub struct ShrinkImpactArgs {
    /// Grid snapshot JSON file.
    pub snapshot: PathBuf,

    #[arg(long)]
    pub columns: u16,

    /// New row count; omit for a growable grid.
    #[arg(long)]
    pub rows: Option<u16>,
}

#[derive(Debug, Clone, Args)]
pub struct PlanTemplateArgs {
    /// JSON file holding one layout template or an array of them.
    pub templates: PathBuf,

    /// Case-insensitive substring of the template name.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ListTemplatesArgs {
    /// JSON file holding one layout template or an array of them.
    pub templates: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct AssignLabelsArgs {
    /// JSON file holding one layout template or an array of them.
    pub templates: PathBuf,

    /// Case-insensitive substring of the template name.
    #[arg(long)]
    pub name: Option<String>,

    /// Scan JSON: case face bounds and detected label rectangles, in pixels.
    #[arg(long)]
    pub scan: PathBuf,
}

/// Labels detected in one photo of a case.
#[derive(Debug, Deserialize)]
struct ScanDocument {
    #[serde(alias = "caseBounds")]
    case_bounds: PixelBounds,
    #[serde(default)]
    labels: Vec<DetectedLabel>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TemplateDocument {
    Many(Vec<LayoutTemplate>),
    One(LayoutTemplate),
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|source| DoctorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| DoctorError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn load_snapshot(path: &Path) -> Result<GridSnapshot> {
    let snapshot: GridSnapshot = read_json(path)?;
    debug!(
        path = %path.display(),
        columns = snapshot.columns,
        rows = ?snapshot.rows,
        occupants = snapshot.occupants.len(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

fn require_positive(flag: &str, value: u16) -> Result<()> {
    if value == 0 {
        return Err(DoctorError::invalid(format!("--{flag} must be at least 1")));
    }
    Ok(())
}

fn describe_rows(rows: Option<u16>) -> String {
    rows.map_or_else(|| "growable".to_string(), |rows| rows.to_string())
}

pub fn run_check(args: CheckArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let snapshot = load_snapshot(&args.snapshot)?;
    let report = snapshot.invariant_report();
    let status = if report.has_errors() { "invalid" } else { "ok" };

    let mut text = format!(
        "{status}: {} occupant(s) in {}x{} grid, state_hash={:#x}",
        snapshot.occupants.len(),
        snapshot.columns,
        describe_rows(snapshot.rows),
        report.snapshot_hash
    );
    for issue in &report.issues {
        text.push_str(&format!("\n  {}", issue.message));
    }
    ctx.emit(
        out,
        json!({
            "command": "check",
            "status": status,
            "state_hash": format!("{:#x}", report.snapshot_hash),
            "occupants": snapshot.occupants.len(),
            "issues": report.issues,
        }),
        &text,
    )?;

    if report.has_errors() {
        return Err(DoctorError::rejected(format!(
            "snapshot has {} invariant issue(s)",
            report.issues.len()
        )));
    }
    Ok(())
}

pub fn run_validate(args: ValidateArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let excluding = args
        .excluding
        .map(|raw| {
            OccupantId::new(raw).ok_or_else(|| DoctorError::invalid("--excluding must be non-zero"))
        })
        .transpose()?;
    let (grid, index) = load_snapshot(&args.snapshot)?.into_parts()?;
    let candidate = Region::new(args.column, args.row, args.width, args.height);
    let verdict = validate(&grid, &index, &candidate, excluding);

    let text = match &verdict {
        Ok(()) => format!("accepted: {candidate}"),
        Err(rejection) => format!("rejected ({}): {rejection}", rejection.code()),
    };
    ctx.emit(
        out,
        json!({
            "command": "validate",
            "accepted": verdict.is_ok(),
            "region": candidate,
            "rejection": verdict.as_ref().err(),
        }),
        &text,
    )?;

    match verdict {
        Ok(()) => Ok(()),
        Err(rejection) => Err(DoctorError::rejected(rejection.to_string())),
    }
}

/// "No room" is a normal answer here, reported with exit status 0.
pub fn run_find_slot(args: FindSlotArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    require_positive("width", args.width)?;
    require_positive("height", args.height)?;
    let (grid, index) = load_snapshot(&args.snapshot)?.into_parts()?;
    let found = find_first_fit(&grid, &index, args.width, args.height);

    let text = match found {
        Some(region) => format!("slot: {region}"),
        None => format!("no free {}x{} slot", args.width, args.height),
    };
    ctx.emit(
        out,
        json!({
            "command": "find-slot",
            "found": found.is_some(),
            "region": found,
        }),
        &text,
    )
}

pub fn run_shrink_impact(args: ShrinkImpactArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    require_positive("columns", args.columns)?;
    if let Some(rows) = args.rows {
        require_positive("rows", rows)?;
    }
    let (_, index) = load_snapshot(&args.snapshot)?.into_parts()?;
    let impact = impact_of_grid_shrink(args.columns, args.rows, &index);

    let ids: Vec<String> = impact.affected_ids.iter().map(ToString::to_string).collect();
    let text = if impact.is_clear() {
        format!(
            "no occupants affected by {}x{}",
            args.columns,
            describe_rows(args.rows)
        )
    } else {
        format!("{} occupant(s) affected: {}", impact.count, ids.join(", "))
    };
    ctx.emit(
        out,
        json!({
            "command": "shrink-impact",
            "columns": args.columns,
            "rows": args.rows,
            "count": impact.count,
            "affected_ids": impact.affected_ids,
        }),
        &text,
    )
}

fn load_templates(path: &Path) -> Result<Vec<LayoutTemplate>> {
    Ok(match read_json::<TemplateDocument>(path)? {
        TemplateDocument::Many(templates) => templates,
        TemplateDocument::One(template) => vec![template],
    })
}

fn select_template<'a>(
    templates: &'a [LayoutTemplate],
    name: Option<&str>,
) -> Result<&'a LayoutTemplate> {
    match name {
        Some(needle) => {
            find_template_by_name(templates, needle).ok_or_else(|| DoctorError::TemplateNotFound {
                needle: needle.to_string(),
            })
        }
        None => match templates {
            [only] => Ok(only),
            _ => Err(DoctorError::invalid(format!(
                "--name is required when the file holds {} templates",
                templates.len()
            ))),
        },
    }
}

pub fn run_list_templates(
    args: ListTemplatesArgs,
    ctx: &Context,
    out: &mut dyn Write,
) -> Result<()> {
    let summaries = summarize_templates(&load_templates(&args.templates)?);
    let mut text = format!("{} template(s)", summaries.len());
    for summary in &summaries {
        text.push_str(&format!("\n  - {summary}"));
    }
    ctx.emit(
        out,
        json!({
            "command": "list-templates",
            "templates": summaries,
        }),
        &text,
    )
}

pub fn run_assign_labels(args: AssignLabelsArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let templates = load_templates(&args.templates)?;
    let template = select_template(&templates, args.name.as_deref())?;
    let scan: ScanDocument = read_json(&args.scan)?;
    let plan = template.plan(&ctx.drawer_sizes()?)?;
    let assigned = plan.assign_labels(scan.case_bounds, &scan.labels);
    debug!(
        template = %template.name,
        labels = scan.labels.len(),
        assigned = assigned.len(),
        "labels assigned"
    );

    let mut text = format!(
        "{}: {} of {} drawer(s) labelled from {} detection(s)",
        template.name,
        assigned.len(),
        plan.drawers.len(),
        scan.labels.len()
    );
    for assignment in &assigned {
        let (x, y) = assignment.label.center();
        text.push_str(&format!(
            "\n  {} {} <- label at ({x:.0}, {y:.0})",
            assignment.size, assignment.region
        ));
    }
    ctx.emit(
        out,
        json!({
            "command": "assign-labels",
            "template": template.name,
            "drawers": plan.drawers.len(),
            "assignments": assigned,
        }),
        &text,
    )
}

pub fn run_plan_template(args: PlanTemplateArgs, ctx: &Context, out: &mut dyn Write) -> Result<()> {
    let templates = load_templates(&args.templates)?;
    let template = select_template(&templates, args.name.as_deref())?;

    let catalog = ctx.drawer_sizes()?;
    let plan = template.plan(&catalog)?;
    debug!(template = %template.name, drawers = plan.drawers.len(), "template planned");

    let mut text = format!(
        "{}: {}x{} grid, {} drawer(s)",
        template.name,
        template.columns,
        template.rows,
        plan.drawers.len()
    );
    for (region, size) in &plan.drawers {
        text.push_str(&format!("\n  {size} {region}"));
    }
    let drawers: Vec<_> = plan
        .drawers
        .iter()
        .map(|(region, size)| json!({ "size": size, "region": region }))
        .collect();
    ctx.emit(
        out,
        json!({
            "command": "plan-template",
            "template": template.name,
            "columns": template.columns,
            "rows": template.rows,
            "drawers": drawers,
        }),
        &text,
    )
}
