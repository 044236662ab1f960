//! Payload flags shared by `add` and `update`
//!
//! One flag set covers every family; each payload type picks the flags it
//! understands and rejects the ones it does not.

use crate::core::entity::Payload;
use crate::entities::{
    EmploymentType, JobFamily, JobFamilyGroup, JobLevel, JobRole, OrgUnit, Position,
    PositionType, SalaryBand, UnitType,
};

#[derive(clap::Args, Debug, Clone, Default)]
pub struct PayloadArgs {
    /// Display name (the title, for positions)
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Parent business code ("0" or "" for a root unit)
    #[arg(long, short = 'p')]
    pub parent: Option<String>,

    /// Free-text description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Organization unit type (company, department, organization-unit, project-team)
    #[arg(long)]
    pub unit_type: Option<UnitType>,

    /// Ordering among sibling units
    #[arg(long, allow_negative_numbers = true)]
    pub sort_order: Option<i32>,

    /// Job level rank label, e.g. P3
    #[arg(long)]
    pub level_rank: Option<String>,

    /// Salary band lower bound
    #[arg(long)]
    pub salary_min: Option<f64>,

    /// Salary band upper bound
    #[arg(long)]
    pub salary_max: Option<f64>,

    /// Salary band currency (3-letter code)
    #[arg(long)]
    pub currency: Option<String>,

    /// Job level a position is graded at
    #[arg(long)]
    pub job_level: Option<String>,

    /// Position type (regular, temporary, contractor)
    #[arg(long)]
    pub position_type: Option<PositionType>,

    /// Employment type (full-time, part-time, intern)
    #[arg(long)]
    pub employment_type: Option<EmploymentType>,

    /// Full-time equivalents a position can hold
    #[arg(long)]
    pub headcount: Option<f64>,

    /// Note attached to this position version only
    #[arg(long)]
    pub remarks: Option<String>,
}

impl PayloadArgs {
    /// Names of flags that were given, for rejecting ones a family ignores
    fn given(&self) -> Vec<&'static str> {
        let mut given = Vec::new();
        let flags: [(&'static str, bool); 14] = [
            ("--name", self.name.is_some()),
            ("--parent", self.parent.is_some()),
            ("--description", self.description.is_some()),
            ("--unit-type", self.unit_type.is_some()),
            ("--sort-order", self.sort_order.is_some()),
            ("--level-rank", self.level_rank.is_some()),
            ("--salary-min", self.salary_min.is_some()),
            ("--salary-max", self.salary_max.is_some()),
            ("--currency", self.currency.is_some()),
            ("--job-level", self.job_level.is_some()),
            ("--position-type", self.position_type.is_some()),
            ("--employment-type", self.employment_type.is_some()),
            ("--headcount", self.headcount.is_some()),
            ("--remarks", self.remarks.is_some()),
        ];
        for (flag, set) in flags {
            if set {
                given.push(flag);
            }
        }
        given
    }

    fn only(&self, allowed: &[&str], noun: &str) -> Result<(), String> {
        match self.given().into_iter().find(|f| !allowed.contains(f)) {
            Some(flag) => Err(format!("{} does not apply to a {}", flag, noun)),
            None => Ok(()),
        }
    }

    fn required(value: &Option<String>, flag: &str) -> Result<String, String> {
        value
            .clone()
            .ok_or_else(|| format!("{} is required", flag))
    }
}

/// Build or amend a payload from command-line flags
pub trait CliPayload: Payload {
    /// Flags this payload reads
    const FLAGS: &'static [&'static str];

    fn from_args(args: &PayloadArgs) -> Result<Self, String>;

    fn apply_args(&mut self, args: &PayloadArgs) -> Result<(), String>;

    fn check_flags(args: &PayloadArgs) -> Result<(), String> {
        args.only(Self::FLAGS, &Self::FAMILY.to_string())
    }
}

fn set<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

fn set_opt<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if let Some(v) = value {
        *target = Some(v.clone());
    }
}

impl CliPayload for OrgUnit {
    const FLAGS: &'static [&'static str] = &[
        "--name",
        "--parent",
        "--description",
        "--unit-type",
        "--sort-order",
    ];

    fn from_args(args: &PayloadArgs) -> Result<Self, String> {
        Self::check_flags(args)?;
        let mut unit = OrgUnit::new(PayloadArgs::required(&args.name, "--name")?);
        unit.apply_args(args)?;
        Ok(unit)
    }

    fn apply_args(&mut self, args: &PayloadArgs) -> Result<(), String> {
        Self::check_flags(args)?;
        set(&mut self.name, &args.name);
        set_opt(&mut self.parent_code, &args.parent);
        set_opt(&mut self.description, &args.description);
        set(&mut self.unit_type, &args.unit_type);
        set(&mut self.sort_order, &args.sort_order);
        Ok(())
    }
}

impl CliPayload for JobFamilyGroup {
    const FLAGS: &'static [&'static str] = &["--name", "--description"];

    fn from_args(args: &PayloadArgs) -> Result<Self, String> {
        Self::check_flags(args)?;
        let mut group = JobFamilyGroup::new(PayloadArgs::required(&args.name, "--name")?);
        group.apply_args(args)?;
        Ok(group)
    }

    fn apply_args(&mut self, args: &PayloadArgs) -> Result<(), String> {
        Self::check_flags(args)?;
        set(&mut self.name, &args.name);
        set_opt(&mut self.description, &args.description);
        Ok(())
    }
}

impl CliPayload for JobFamily {
    const FLAGS: &'static [&'static str] = &["--name", "--parent", "--description"];

    fn from_args(args: &PayloadArgs) -> Result<Self, String> {
        Self::check_flags(args)?;
        let mut family = JobFamily::new(
            PayloadArgs::required(&args.name, "--name")?,
            PayloadArgs::required(&args.parent, "--parent")?,
        );
        family.apply_args(args)?;
        Ok(family)
    }

    fn apply_args(&mut self, args: &PayloadArgs) -> Result<(), String> {
        Self::check_flags(args)?;
        set(&mut self.name, &args.name);
        set(&mut self.group_code, &args.parent);
        set_opt(&mut self.description, &args.description);
        Ok(())
    }
}

impl CliPayload for JobRole {
    const FLAGS: &'static [&'static str] = &["--name", "--parent", "--description"];

    fn from_args(args: &PayloadArgs) -> Result<Self, String> {
        Self::check_flags(args)?;
        let mut role = JobRole::new(
            PayloadArgs::required(&args.name, "--name")?,
            PayloadArgs::required(&args.parent, "--parent")?,
        );
        role.apply_args(args)?;
        Ok(role)
    }

    fn apply_args(&mut self, args: &PayloadArgs) -> Result<(), String> {
        Self::check_flags(args)?;
        set(&mut self.name, &args.name);
        set(&mut self.family_code, &args.parent);
        set_opt(&mut self.description, &args.description);
        Ok(())
    }
}

impl CliPayload for JobLevel {
    const FLAGS: &'static [&'static str] = &[
        "--name",
        "--parent",
        "--description",
        "--level-rank",
        "--salary-min",
        "--salary-max",
        "--currency",
    ];

    fn from_args(args: &PayloadArgs) -> Result<Self, String> {
        Self::check_flags(args)?;
        let mut level = JobLevel::new(
            PayloadArgs::required(&args.name, "--name")?,
            PayloadArgs::required(&args.parent, "--parent")?,
            PayloadArgs::required(&args.level_rank, "--level-rank")?,
        );
        level.apply_args(args)?;
        Ok(level)
    }

    fn apply_args(&mut self, args: &PayloadArgs) -> Result<(), String> {
        Self::check_flags(args)?;
        set(&mut self.name, &args.name);
        set(&mut self.role_code, &args.parent);
        set(&mut self.level_rank, &args.level_rank);
        set_opt(&mut self.description, &args.description);

        let touches_band =
            args.salary_min.is_some() || args.salary_max.is_some() || args.currency.is_some();
        if touches_band {
            let existing = self.salary_band.take();
            let min = args
                .salary_min
                .or(existing.as_ref().map(|b| b.min))
                .ok_or("--salary-min is required for a new salary band")?;
            let max = args
                .salary_max
                .or(existing.as_ref().map(|b| b.max))
                .ok_or("--salary-max is required for a new salary band")?;
            let currency = args
                .currency
                .clone()
                .or(existing.map(|b| b.currency))
                .unwrap_or_else(|| "USD".to_string());
            self.salary_band = Some(SalaryBand {
                min,
                max,
                currency: currency.to_uppercase(),
            });
        }
        Ok(())
    }
}

impl CliPayload for Position {
    const FLAGS: &'static [&'static str] = &[
        "--name",
        "--parent",
        "--job-level",
        "--position-type",
        "--employment-type",
        "--headcount",
        "--remarks",
    ];

    fn from_args(args: &PayloadArgs) -> Result<Self, String> {
        Self::check_flags(args)?;
        let mut position = Position::new(
            PayloadArgs::required(&args.name, "--name")?,
            PayloadArgs::required(&args.parent, "--parent")?,
        );
        position.apply_args(args)?;
        Ok(position)
    }

    fn apply_args(&mut self, args: &PayloadArgs) -> Result<(), String> {
        Self::check_flags(args)?;
        set(&mut self.title, &args.name);
        set(&mut self.organization_code, &args.parent);
        set_opt(&mut self.job_level_code, &args.job_level);
        set(&mut self.position_type, &args.position_type);
        set(&mut self.employment_type, &args.employment_type);
        set(&mut self.headcount_capacity, &args.headcount);
        set_opt(&mut self.remarks, &args.remarks);
        Ok(())
    }
}
