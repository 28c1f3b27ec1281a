//! The dashboard's editable collections and their draft forms.

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use shared::{
    domain::{
        BlogPost, CashflowEntry, CashflowType, Homestay, Period, Position, Record, StructureSeat,
    },
    protocol::{
        aggregate_text, BlogInput, CashflowInput, HomestayInput, PeriodInput, PositionInput,
    },
};
use url::Url;

use crate::validation::{FieldChecks, FieldErrors};

/// A listable, editable collection exposed by the dashboard API.
pub trait Resource: Send + Sync + 'static {
    type Record: Record + DeserializeOwned + Debug;
    type Payload: Serialize + Clone + Send + Sync + Debug;
    type Form: DraftForm<Record = Self::Record, Payload = Self::Payload>;
    type Filter: Clone + Send + Sync + Debug;

    /// Lower-case noun used in notification titles.
    const LABEL: &'static str;
    /// Collection path under `/api/v1/`.
    const PATH: &'static str;
    /// Field of the list payload holding the page items.
    const ITEMS_KEY: &'static str;

    fn matches(record: &Self::Record, filter: &Self::Filter) -> bool;

    /// Whether the record can be switched on as the current one.
    fn can_activate(_record: &Self::Record) -> bool {
        false
    }

    /// True when the first page's aggregates already say the filtered view is empty.
    fn aggregates_rule_out(_filter: &Self::Filter, _aggregates: &Map<String, Value>) -> bool {
        false
    }
}

/// Client-held editable copy of a record.
pub trait DraftForm: Clone + Default + Send + Sync + Debug + 'static {
    type Record;
    type Payload;

    fn from_record(record: &Self::Record) -> Self;
    fn validate(&self) -> Result<Self::Payload, FieldErrors>;
}

pub struct Cashflows;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CashflowForm {
    pub date: String,
    pub idr_amount: String,
    pub note: String,
    pub kind: Option<CashflowType>,
}

impl DraftForm for CashflowForm {
    type Record = CashflowEntry;
    type Payload = CashflowInput;

    fn from_record(record: &CashflowEntry) -> Self {
        Self {
            date: record.date.format("%Y-%m-%d").to_string(),
            idr_amount: record.idr_amount.clone(),
            note: record.note.clone(),
            kind: Some(record.kind),
        }
    }

    fn validate(&self) -> Result<CashflowInput, FieldErrors> {
        let mut checks = FieldChecks::default();
        let date = checks.required_date("date", &self.date);
        let idr_amount = checks.required_amount("idr_amount", &self.idr_amount);
        let kind = checks.required_choice("type", self.kind);
        let note = checks.optional_text(&self.note).unwrap_or_default();

        let (Some(date), Some(idr_amount), Some(kind)) = (date, idr_amount, kind) else {
            return Err(checks.into_errors());
        };
        if is_zero(&idr_amount) {
            checks.reject("idr_amount", "must be greater than zero");
        }
        checks.finish()?;

        Ok(CashflowInput {
            date,
            idr_amount,
            note,
            kind,
        })
    }
}

impl Resource for Cashflows {
    type Record = CashflowEntry;
    type Payload = CashflowInput;
    type Form = CashflowForm;
    type Filter = CashflowType;

    const LABEL: &'static str = "transaction";
    const PATH: &'static str = "cashflows";
    const ITEMS_KEY: &'static str = "cashflows";

    fn matches(record: &CashflowEntry, filter: &CashflowType) -> bool {
        record.kind == *filter
    }

    fn aggregates_rule_out(filter: &CashflowType, aggregates: &Map<String, Value>) -> bool {
        aggregate_text(aggregates, filter.aggregate_field())
            .is_some_and(|total| is_zero(&total))
    }
}

fn is_zero(amount: &str) -> bool {
    let amount = amount.trim();
    !amount.is_empty() && amount.chars().all(|c| c == '0' || c == '.')
}

/// Running totals carried on the first cashflow page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CashflowSummary {
    pub income: String,
    pub outcome: String,
    pub total: String,
}

impl CashflowSummary {
    pub fn from_aggregates(aggregates: &Map<String, Value>) -> Option<Self> {
        let text = |key: &str| aggregate_text(aggregates, key);
        Some(Self {
            income: text("income_cash")?,
            outcome: text("outcome_cash")?,
            total: text("total_cash")?,
        })
    }

    pub fn for_type(&self, kind: CashflowType) -> &str {
        match kind {
            CashflowType::Income => &self.income,
            CashflowType::Outcome => &self.outcome,
        }
    }
}

pub struct Positions;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionForm {
    pub name: String,
    pub level: String,
}

impl DraftForm for PositionForm {
    type Record = Position;
    type Payload = PositionInput;

    fn from_record(record: &Position) -> Self {
        Self {
            name: record.name.clone(),
            level: record.level.to_string(),
        }
    }

    fn validate(&self) -> Result<PositionInput, FieldErrors> {
        let mut checks = FieldChecks::default();
        let name = checks.required_text("name", &self.name);
        let level = checks.required_number::<i32>("level", &self.level);

        match (name, level) {
            (Some(name), Some(level)) => Ok(PositionInput { name, level }),
            _ => Err(checks.into_errors()),
        }
    }
}

impl Resource for Positions {
    type Record = Position;
    type Payload = PositionInput;
    type Form = PositionForm;
    type Filter = i32;

    const LABEL: &'static str = "position";
    const PATH: &'static str = "positions";
    const ITEMS_KEY: &'static str = "positions";

    fn matches(record: &Position, level: &i32) -> bool {
        record.level == *level
    }
}

pub struct Periods;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodForm {
    pub start_date: String,
    pub end_date: String,
    pub goals: String,
    pub structure: Vec<StructureSeat>,
}

impl DraftForm for PeriodForm {
    type Record = Period;
    type Payload = PeriodInput;

    fn from_record(record: &Period) -> Self {
        let date_text = |date: Option<chrono::NaiveDate>| {
            date.map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };
        Self {
            start_date: date_text(record.start_date),
            end_date: date_text(record.end_date),
            goals: record.goals.clone().unwrap_or_default(),
            structure: record.structure.clone(),
        }
    }

    fn validate(&self) -> Result<PeriodInput, FieldErrors> {
        let mut checks = FieldChecks::default();
        let start_date = checks.required_date("start_date", &self.start_date);
        let end_date = checks.required_date("end_date", &self.end_date);
        let goals = checks.optional_text(&self.goals);

        let (Some(start_date), Some(end_date)) = (start_date, end_date) else {
            return Err(checks.into_errors());
        };
        if end_date < start_date {
            checks.reject("end_date", "must not be before the start date");
        }
        checks.finish()?;

        Ok(PeriodInput {
            start_date,
            end_date,
            goals,
            structure: self.structure.clone(),
        })
    }
}

/// Period tabs: active only or archived only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodFilter {
    Active,
    Archived,
}

impl std::str::FromStr for PeriodFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown period filter '{other}'")),
        }
    }
}

impl Resource for Periods {
    type Record = Period;
    type Payload = PeriodInput;
    type Form = PeriodForm;
    type Filter = PeriodFilter;

    const LABEL: &'static str = "period";
    const PATH: &'static str = "periods";
    const ITEMS_KEY: &'static str = "periods";

    fn matches(record: &Period, filter: &PeriodFilter) -> bool {
        match filter {
            PeriodFilter::Active => record.is_active,
            PeriodFilter::Archived => !record.is_active,
        }
    }

    fn can_activate(record: &Period) -> bool {
        !record.is_active
    }
}

pub struct Blogs;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogForm {
    pub title: String,
    pub summary: String,
    pub body: String,
}

impl DraftForm for BlogForm {
    type Record = BlogPost;
    type Payload = BlogInput;

    fn from_record(record: &BlogPost) -> Self {
        Self {
            title: record.title.clone(),
            summary: record.summary.clone(),
            body: record.body.clone(),
        }
    }

    fn validate(&self) -> Result<BlogInput, FieldErrors> {
        let mut checks = FieldChecks::default();
        let title = checks.required_text("title", &self.title);
        let body = checks.required_text("body", &self.body);
        let summary = checks.optional_text(&self.summary).unwrap_or_default();

        match (title, body) {
            (Some(title), Some(body)) => Ok(BlogInput {
                title,
                summary,
                body,
            }),
            _ => Err(checks.into_errors()),
        }
    }
}

impl Resource for Blogs {
    type Record = BlogPost;
    type Payload = BlogInput;
    type Form = BlogForm;
    type Filter = String;

    const LABEL: &'static str = "blog post";
    const PATH: &'static str = "blogs";
    const ITEMS_KEY: &'static str = "blogs";

    /// Case-insensitive title search.
    fn matches(record: &BlogPost, query: &String) -> bool {
        record
            .title
            .to_lowercase()
            .contains(&query.trim().to_lowercase())
    }
}

pub struct Homestays;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HomestayForm {
    pub name: String,
    pub address: String,
    pub thumbnail_url: String,
}

impl DraftForm for HomestayForm {
    type Record = Homestay;
    type Payload = HomestayInput;

    fn from_record(record: &Homestay) -> Self {
        Self {
            name: record.name.clone(),
            address: record.address.clone(),
            thumbnail_url: record.thumbnail_url.clone().unwrap_or_default(),
        }
    }

    fn validate(&self) -> Result<HomestayInput, FieldErrors> {
        let mut checks = FieldChecks::default();
        let name = checks.required_text("name", &self.name);
        let address = checks.required_text("address", &self.address);
        let thumbnail_url = checks.optional_text(&self.thumbnail_url);

        if let Some(raw) = thumbnail_url.as_deref() {
            match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                _ => checks.reject("thumbnail_url", "must be an http(s) URL"),
            }
        }
        let (Some(name), Some(address)) = (name, address) else {
            return Err(checks.into_errors());
        };
        checks.finish()?;

        Ok(HomestayInput {
            name,
            address,
            thumbnail_url,
        })
    }
}

impl Resource for Homestays {
    type Record = Homestay;
    type Payload = HomestayInput;
    type Form = HomestayForm;
    type Filter = String;

    const LABEL: &'static str = "homestay";
    const PATH: &'static str = "homestays";
    const ITEMS_KEY: &'static str = "homestays";

    /// Case-insensitive search over name and address.
    fn matches(record: &Homestay, query: &String) -> bool {
        let query = query.trim().to_lowercase();
        record.name.to_lowercase().contains(&query)
            || record.address.to_lowercase().contains(&query)
    }
}

#[cfg(test)]
#[path = "tests/resources_tests.rs"]
mod tests;
