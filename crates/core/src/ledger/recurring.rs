//! Recurring journal templates.
//!
//! A template describes a set of lines and a schedule. Each generation produces
//! a draft journal entry dated on the generation day and advances the schedule
//! by one frequency unit.

use chrono::{Days, Months, NaiveDate};
use folio_shared::types::{AccountId, CompanyId, Currency, RecurringTemplateId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::fiscal::{AccountingPeriod, FiscalYear, resolve_active_period};
use super::journal::{JournalEntry, JournalLine, NewJournalEntry};
use super::numbering::EntryNumbering;
use super::types::{Dimensions, JournalEntryType, PostingContext, SourceReference};
use crate::batch::BatchOutcome;

/// How often a template generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Every day.
    Daily,
    /// Every 7 days.
    Weekly,
    /// Every 14 days.
    Biweekly,
    /// Every month.
    Monthly,
    /// Every 3 months.
    Quarterly,
    /// Every 6 months.
    HalfYearly,
    /// Every 12 months.
    Yearly,
}

impl Frequency {
    /// Returns the string representation of the frequency.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::HalfYearly => "half_yearly",
            Self::Yearly => "yearly",
        }
    }

    /// Parses a frequency from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "biweekly" => Some(Self::Biweekly),
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "half_yearly" => Some(Self::HalfYearly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }

    /// Adds one unit to `date`.
    ///
    /// Month-based units clamp to the last day of the target month
    /// (Jan 31 + 1 month = Feb 29 in a leap year).
    pub fn advance(self, date: NaiveDate) -> Result<NaiveDate, LedgerError> {
        let next = match self {
            Self::Daily => date.checked_add_days(Days::new(1)),
            Self::Weekly => date.checked_add_days(Days::new(7)),
            Self::Biweekly => date.checked_add_days(Days::new(14)),
            Self::Monthly => date.checked_add_months(Months::new(1)),
            Self::Quarterly => date.checked_add_months(Months::new(3)),
            Self::HalfYearly => date.checked_add_months(Months::new(6)),
            Self::Yearly => date.checked_add_months(Months::new(12)),
        };
        next.ok_or(LedgerError::ScheduleOverflow(date))
    }
}

/// One line of a template, stored as JSON on the template row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLine {
    /// Account to post to.
    pub account_id: AccountId,
    /// Debit amount.
    #[serde(default)]
    pub debit: Decimal,
    /// Credit amount.
    #[serde(default)]
    pub credit: Decimal,
    /// Line narrative.
    #[serde(default)]
    pub description: Option<String>,
    /// Analytic tags.
    #[serde(default)]
    pub dimensions: Dimensions,
}

impl TemplateLine {
    fn to_journal_line(&self) -> Result<JournalLine, LedgerError> {
        let mut line = JournalLine::new(self.account_id, self.debit, self.credit)?
            .with_dimensions(self.dimensions);
        line.description.clone_from(&self.description);
        Ok(line)
    }
}

/// A recurring journal template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringTemplate {
    /// Unique identifier.
    pub id: RecurringTemplateId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Template name.
    pub name: String,
    /// Narrative for generated entries; the name is used when absent.
    pub description: Option<String>,
    /// Schedule unit.
    pub frequency: Frequency,
    /// First generation date.
    pub start_date: NaiveDate,
    /// Last date generation may happen on.
    pub end_date: Option<NaiveDate>,
    /// Occurrence ceiling.
    pub max_occurrences: Option<u32>,
    /// Occurrences generated so far.
    pub occurrences_count: u32,
    /// Date of the last generation.
    pub last_generated_date: Option<NaiveDate>,
    /// Next scheduled generation date.
    pub next_generation_date: Option<NaiveDate>,
    /// Inactive templates never generate.
    pub is_active: bool,
    /// Type of generated entries.
    pub entry_type: JournalEntryType,
    /// Currency of generated entries.
    pub currency: Currency,
    /// Exchange rate of generated entries.
    pub exchange_rate: Decimal,
    /// Line template, in order.
    pub lines: Vec<TemplateLine>,
}

impl RecurringTemplate {
    /// Returns true once the occurrence ceiling is reached.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.max_occurrences
            .is_some_and(|max| self.occurrences_count >= max)
    }

    /// The date the next occurrence is scheduled for.
    #[must_use]
    pub fn due_date(&self) -> NaiveDate {
        self.next_generation_date.unwrap_or(self.start_date)
    }

    /// Returns true if the template should generate on `today`.
    ///
    /// False when inactive, past its end date, at its ceiling, or when the
    /// next generation date is still in the future.
    #[must_use]
    pub fn should_generate(&self, today: NaiveDate) -> bool {
        if !self.is_active || self.is_exhausted() {
            return false;
        }
        if self.end_date.is_some_and(|end| today > end) {
            return false;
        }
        self.due_date() <= today
    }
}

/// Stateless recurring generation logic.
pub struct RecurringService;

impl RecurringService {
    /// Generates one draft entry from `template` into `period`.
    ///
    /// The entry is dated `ctx.today()`; the period must be open and cover it.
    /// The template must be due: active, below its ceiling, not past its end
    /// date and scheduled on or before today. The schedule is advanced one
    /// unit from the occurrence being generated, so a late run catches up one
    /// occurrence at a time.
    pub fn generate(
        template: &mut RecurringTemplate,
        year: &FiscalYear,
        period: &AccountingPeriod,
        numbering: &dyn EntryNumbering,
        ctx: &PostingContext,
    ) -> Result<JournalEntry, LedgerError> {
        let label = format!("Recurring template {}", template.name);
        if !template.is_active {
            return Err(LedgerError::invalid_state(label, "inactive", "active"));
        }
        if template.is_exhausted() {
            return Err(LedgerError::invalid_state(
                label,
                format!(
                    "at {} of {} occurrences",
                    template.occurrences_count,
                    template.max_occurrences.unwrap_or(template.occurrences_count)
                ),
                "below its occurrence ceiling",
            ));
        }

        let today = ctx.today();
        if let Some(end) = template.end_date.filter(|end| today > *end) {
            return Err(LedgerError::invalid_state(
                label,
                format!("ended on {end}"),
                "within its schedule",
            ));
        }
        let due = template.due_date();
        if due > today {
            return Err(LedgerError::invalid_state(
                label,
                format!("due on {due}"),
                format!("due on or before {today}"),
            ));
        }
        if period.fiscal_year_id != year.id {
            return Err(LedgerError::NoActivePeriod {
                company_id: template.company_id,
                date: today,
            });
        }
        period.ensure_accepts(today)?;

        let lines = template
            .lines
            .iter()
            .map(TemplateLine::to_journal_line)
            .collect::<Result<Vec<_>, _>>()?;
        let next_date = template.frequency.advance(template.due_date())?;

        let mut entry = JournalEntry::new(
            NewJournalEntry {
                company_id: template.company_id,
                fiscal_year_id: year.id,
                accounting_period_id: period.id,
                entry_type: template.entry_type,
                entry_date: today,
                description: template
                    .description
                    .clone()
                    .unwrap_or_else(|| template.name.clone()),
                reference: Some(SourceReference::RecurringTemplate(template.id)),
                reference_number: Some(template.name.clone()),
                currency: template.currency,
                exchange_rate: template.exchange_rate,
            },
            ctx,
        );
        entry.replace_lines(lines)?;
        entry.assign_number(numbering);

        template.occurrences_count += 1;
        template.last_generated_date = Some(today);
        template.next_generation_date = Some(next_date);

        Ok(entry)
    }

    /// Resolves the company's default year and open period for today, then generates.
    pub fn generate_for_today(
        template: &mut RecurringTemplate,
        years: &[FiscalYear],
        periods: &[AccountingPeriod],
        numbering: &dyn EntryNumbering,
        ctx: &PostingContext,
    ) -> Result<JournalEntry, LedgerError> {
        let (year, period) =
            resolve_active_period(years, periods, template.company_id, ctx.today())?;
        Self::generate(template, year, period, numbering, ctx)
    }

    /// Generates every due template, isolating failures per template.
    ///
    /// A failing template is left unchanged and reported; the others proceed.
    pub fn generate_due(
        templates: &mut [RecurringTemplate],
        years: &[FiscalYear],
        periods: &[AccountingPeriod],
        numbering: &dyn EntryNumbering,
        ctx: &PostingContext,
    ) -> BatchOutcome<RecurringTemplateId, JournalEntry, LedgerError> {
        let today = ctx.today();
        templates
            .iter_mut()
            .filter(|t| t.should_generate(today))
            .map(|template| {
                let mut working = template.clone();
                let result = Self::generate_for_today(&mut working, years, periods, numbering, ctx);
                if result.is_ok() {
                    *template = working;
                }
                (template.id, result)
            })
            .collect()
    }
}
