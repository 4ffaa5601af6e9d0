//! Declarative per-field validation.
//!
//! A [`Schema`] lists the rules for each field of a form. The same schema backs
//! two passes: [`Schema::check_advisory`] evaluates everything that needs no
//! database access and is offered to clients for instant feedback, while
//! [`Schema::check`] also runs the uniqueness and foreign-key rules and is the
//! only pass allowed to accept a write.

pub mod input;
pub mod rules;
pub mod slug;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::DbErr;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::errors::ServiceError;

pub use input::{FieldValue, FormInput, ImageKind, UploadedFile};
pub use slug::slugify;

use input::{decode_bool, decode_decimal, decode_integer};

const ACCEPTED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    Required,
    Text,
    MaxLength { max: usize },
    Integer,
    Numeric,
    Boolean,
    Min { min: Decimal },
    Max { max: Decimal },
    DecimalPlaces { max: u32 },
    Unique { table: &'static str, column: &'static str },
    Exists { table: &'static str },
    Image { max_kib: u64 },
}

impl Rule {
    fn needs_database(&self) -> bool {
        matches!(self, Rule::Unique { .. } | Rule::Exists { .. })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldRules {
    pub field: &'static str,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Schema {
    pub entity: &'static str,
    pub fields: Vec<FieldRules>,
}

/// Whether a submission creates a record or replaces one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update { id: i32 },
}

impl Mode {
    fn excluded_id(self) -> Option<i32> {
        match self {
            Mode::Create => None,
            Mode::Update { id } => Some(id),
        }
    }
}

/// Database checks the authoritative pass needs.
#[async_trait]
pub trait RecordLookup: Send + Sync {
    /// True when another row already holds `value` in `table.column`.
    async fn value_taken(
        &self,
        table: &str,
        column: &str,
        value: &str,
        except_id: Option<i32>,
    ) -> Result<bool, DbErr>;

    async fn row_exists(&self, table: &str, id: i32) -> Result<bool, DbErr>;
}

/// Field name to first violated message, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(String, String)>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first message recorded for a field.
    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.0.push((field.to_string(), message.into()));
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, message)| message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn into_result(self) -> Result<(), ServiceError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::ValidationError(self))
        }
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, message) in &self.0 {
            map.serialize_entry(field, message)?;
        }
        map.end()
    }
}

/// Spells a field key as lower-case words: `categoryId` becomes "category id".
pub fn humanize(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for ch in field.chars() {
        if ch == '_' || ch == '-' {
            out.push(' ');
        } else if ch.is_ascii_uppercase() {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

impl Schema {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: &'static str, rules: Vec<Rule>) -> Self {
        self.fields.push(FieldRules { field, rules });
        self
    }

    pub fn rules_for(&self, field: &str) -> Option<&[Rule]> {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.rules.as_slice())
    }

    /// Advisory pass: every rule that needs no database access.
    pub fn check_advisory(&self, input: &FormInput, mode: Mode) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for field in &self.fields {
            if let Some(message) = precheck(field, input, mode) {
                errors.insert(field.field, message);
                continue;
            }
            let Some(value) = present_value(input, field.field) else {
                continue;
            };
            if let Some(message) = field
                .rules
                .iter()
                .filter(|rule| !rule.needs_database())
                .find_map(|rule| local_violation(rule, field.field, value))
            {
                errors.insert(field.field, message);
            }
        }
        errors
    }

    /// Authoritative pass. Rules run in declared order and each field stops at
    /// its first violation, so database rules only see well-typed values.
    pub async fn check(
        &self,
        input: &FormInput,
        mode: Mode,
        lookup: &dyn RecordLookup,
    ) -> Result<(), ServiceError> {
        let mut errors = FieldErrors::new();
        for field in &self.fields {
            if let Some(message) = precheck(field, input, mode) {
                errors.insert(field.field, message);
                continue;
            }
            let Some(value) = present_value(input, field.field) else {
                continue;
            };
            for rule in &field.rules {
                let violation = match rule {
                    Rule::Unique { table, column } => {
                        database_violation_unique(lookup, table, column, field.field, value, mode)
                            .await?
                    }
                    Rule::Exists { table } => {
                        database_violation_exists(lookup, table, field.field, value).await?
                    }
                    local => local_violation(local, field.field, value),
                };
                if let Some(message) = violation {
                    errors.insert(field.field, message);
                    break;
                }
            }
        }
        errors.into_result()
    }
}

/// Presence rules, evaluated before any typed rule.
fn precheck(field: &FieldRules, input: &FormInput, mode: Mode) -> Option<String> {
    let label = humanize(field.field);
    if matches!(mode, Mode::Update { .. }) && !input.contains(field.field) {
        return Some(format!("The {} field must be present.", label));
    }
    let empty = input.get(field.field).map_or(true, FieldValue::is_empty);
    if empty && field.rules.contains(&Rule::Required) {
        return Some(format!("The {} field is required.", label));
    }
    None
}

/// Non-empty value, or `None` when the field is absent and nullable.
fn present_value<'a>(input: &'a FormInput, field: &str) -> Option<&'a FieldValue> {
    input.get(field).filter(|value| !value.is_empty())
}

fn local_violation(rule: &Rule, field: &str, value: &FieldValue) -> Option<String> {
    let label = humanize(field);
    let text = value.as_text();
    match rule {
        Rule::Required | Rule::Unique { .. } | Rule::Exists { .. } => None,
        Rule::Text => text
            .is_none()
            .then(|| format!("The {} field must be a string.", label)),
        Rule::MaxLength { max } => text
            .filter(|t| t.chars().count() > *max)
            .map(|_| format!("The {} field must not be greater than {} characters.", label, max)),
        Rule::Integer => text
            .and_then(decode_integer)
            .is_none()
            .then(|| format!("The {} field must be an integer.", label)),
        Rule::Numeric => text
            .and_then(decode_decimal)
            .is_none()
            .then(|| format!("The {} field must be a number.", label)),
        Rule::Boolean => text
            .and_then(decode_bool)
            .is_none()
            .then(|| format!("The {} field must be true or false.", label)),
        Rule::Min { min } => match text.and_then(decode_decimal) {
            Some(number) if number < *min => {
                Some(format!("The {} field must be at least {}.", label, min))
            }
            Some(_) => None,
            None => Some(format!("The {} field must be a number.", label)),
        },
        Rule::Max { max } => match text.and_then(decode_decimal) {
            Some(number) if number > *max => {
                Some(format!("The {} field must not be greater than {}.", label, max))
            }
            Some(_) => None,
            None => Some(format!("The {} field must be a number.", label)),
        },
        Rule::DecimalPlaces { max } => match text.and_then(decode_decimal) {
            Some(number) if number.scale() > *max => Some(format!(
                "The {} field must have 0-{} decimal places.",
                label, max
            )),
            Some(_) => None,
            None => Some(format!("The {} field must be a number.", label)),
        },
        Rule::Image { max_kib } => image_violation(&label, value, *max_kib),
    }
}

fn image_violation(label: &str, value: &FieldValue, max_kib: u64) -> Option<String> {
    let FieldValue::File(file) = value else {
        return Some(format!("The {} field must be an image.", label));
    };
    if file.kind().is_none() {
        return Some(format!("The {} field must be an image.", label));
    }
    let declared_ok = file.content_type.as_deref().map_or(true, |declared| {
        ACCEPTED_IMAGE_TYPES.contains(&declared.to_ascii_lowercase().as_str())
    });
    if !declared_ok {
        return Some(format!(
            "The {} field must be a file of type: jpeg, png, jpg, webp.",
            label
        ));
    }
    if file.len() as u64 > max_kib * 1024 {
        return Some(format!(
            "The {} field must not be greater than {} kilobytes.",
            label, max_kib
        ));
    }
    None
}

async fn database_violation_unique(
    lookup: &dyn RecordLookup,
    table: &str,
    column: &str,
    field: &str,
    value: &FieldValue,
    mode: Mode,
) -> Result<Option<String>, ServiceError> {
    let Some(text) = value.as_text() else {
        return Ok(None);
    };
    let taken = lookup
        .value_taken(table, column, text, mode.excluded_id())
        .await?;
    Ok(taken.then(|| format!("The {} has already been taken.", humanize(field))))
}

async fn database_violation_exists(
    lookup: &dyn RecordLookup,
    table: &str,
    field: &str,
    value: &FieldValue,
) -> Result<Option<String>, ServiceError> {
    let exists = match value.as_text().and_then(decode_integer) {
        Some(id) => lookup.row_exists(table, id).await?,
        None => false,
    };
    Ok((!exists).then(|| format!("The selected {} is invalid.", humanize(field))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    /// In-memory stand-in for the database checks.
    #[derive(Default)]
    struct FakeLookup {
        taken: HashSet<(String, String, String, i32)>,
        rows: HashSet<(String, i32)>,
    }

    impl FakeLookup {
        fn with_value(mut self, table: &str, column: &str, value: &str, owner: i32) -> Self {
            self.taken
                .insert((table.into(), column.into(), value.into(), owner));
            self
        }

        fn with_row(mut self, table: &str, id: i32) -> Self {
            self.rows.insert((table.into(), id));
            self
        }
    }

    #[async_trait]
    impl RecordLookup for FakeLookup {
        async fn value_taken(
            &self,
            table: &str,
            column: &str,
            value: &str,
            except_id: Option<i32>,
        ) -> Result<bool, DbErr> {
            Ok(self.taken.iter().any(|(t, c, v, owner)| {
                t == table && c == column && v == value && Some(*owner) != except_id
            }))
        }

        async fn row_exists(&self, table: &str, id: i32) -> Result<bool, DbErr> {
            Ok(self.rows.contains(&(table.to_string(), id)))
        }
    }

    fn schema() -> Schema {
        Schema::new("Widget")
            .field("name", vec![Rule::Required, Rule::Text, Rule::MaxLength { max: 5 }])
            .field(
                "slug",
                vec![
                    Rule::Required,
                    Rule::Text,
                    Rule::Unique {
                        table: "widgets",
                        column: "slug",
                    },
                ],
            )
            .field("note", vec![Rule::Text])
            .field(
                "stock",
                vec![Rule::Required, Rule::Integer, Rule::Min { min: dec!(0) }],
            )
            .field(
                "categoryId",
                vec![Rule::Required, Rule::Integer, Rule::Exists { table: "categories" }],
            )
    }

    fn valid() -> FormInput {
        FormInput::new()
            .with_text("name", "Nut")
            .with_text("slug", "nut")
            .with_text("stock", "3")
            .with_text("categoryId", "1")
    }

    fn lookup() -> FakeLookup {
        FakeLookup::default()
            .with_row("categories", 1)
            .with_value("widgets", "slug", "bolt", 7)
    }

    #[test]
    fn humanize_splits_camel_case() {
        assert_eq!(humanize("categoryId"), "category id");
        assert_eq!(humanize("vehicleBrandId"), "vehicle brand id");
        assert_eq!(humanize("name"), "name");
        assert_eq!(humanize("created_at"), "created at");
    }

    #[tokio::test]
    async fn valid_input_passes_both_passes() {
        assert!(schema().check_advisory(&valid(), Mode::Create).is_empty());
        schema()
            .check(&valid(), Mode::Create, &lookup())
            .await
            .unwrap();
    }

    #[test]
    fn advisory_reports_first_violation_per_field() {
        let input = FormInput::new()
            .with_text("name", "Too long a name")
            .with_text("stock", "-1")
            .with_text("categoryId", "x");

        let errors = schema().check_advisory(&input, Mode::Create);
        assert_eq!(
            errors.get("name"),
            Some("The name field must not be greater than 5 characters.")
        );
        assert_eq!(errors.get("slug"), Some("The slug field is required."));
        assert_eq!(errors.get("stock"), Some("The stock field must be at least 0."));
        assert_eq!(
            errors.get("categoryId"),
            Some("The category id field must be an integer.")
        );
        assert_eq!(errors.fields(), vec!["name", "slug", "stock", "categoryId"]);
    }

    #[test]
    fn advisory_skips_database_rules() {
        let input = valid().with_text("slug", "bolt").with_text("categoryId", "99");
        assert!(schema().check_advisory(&input, Mode::Create).is_empty());
    }

    #[tokio::test]
    async fn unique_rejects_other_rows_value() {
        let input = valid().with_text("slug", "bolt");
        let err = schema()
            .check(&input, Mode::Create, &lookup())
            .await
            .unwrap_err();
        let ServiceError::ValidationError(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("slug"), Some("The slug has already been taken."));
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn unique_excludes_own_id_on_update() {
        let input = valid().with_text("slug", "bolt").with_text("note", "x");
        schema()
            .check(&input, Mode::Update { id: 7 }, &lookup())
            .await
            .unwrap();

        assert!(schema()
            .check(&input, Mode::Update { id: 8 }, &lookup())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn exists_rejects_missing_parent() {
        let input = valid().with_text("categoryId", "42");
        let err = schema()
            .check(&input, Mode::Create, &lookup())
            .await
            .unwrap_err();
        let ServiceError::ValidationError(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.get("categoryId"),
            Some("The selected category id is invalid.")
        );
    }

    #[test]
    fn update_requires_every_declared_field() {
        let errors = schema().check_advisory(&valid(), Mode::Update { id: 1 });
        assert_eq!(errors.get("note"), Some("The note field must be present."));
        assert_eq!(errors.len(), 1);

        let explicit_null = valid().with_text("note", "");
        assert!(schema()
            .check_advisory(&explicit_null, Mode::Update { id: 1 })
            .is_empty());
    }

    #[test]
    fn nullable_fields_skip_rules_when_empty() {
        let input = valid().with_text("note", "   ");
        assert!(schema().check_advisory(&input, Mode::Create).is_empty());
    }

    #[test]
    fn files_fail_text_rules() {
        let file = UploadedFile::new("a.png", "image/png", b"\x89PNG\r\n\x1a\n".to_vec());
        let input = valid().with_file("name", file);
        let errors = schema().check_advisory(&input, Mode::Create);
        assert_eq!(errors.get("name"), Some("The name field must be a string."));
    }

    #[test]
    fn image_rule_checks_content_type_and_size() {
        let schema = Schema::new("Upload").field("image", vec![Rule::Required, Rule::Image { max_kib: 1 }]);
        let jpeg = |len: usize, mime: &str| {
            let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
            bytes.resize(len, 0);
            FormInput::new().with_file("image", UploadedFile::new("p.jpg", mime, bytes))
        };

        assert!(schema.check_advisory(&jpeg(1024, "image/jpeg"), Mode::Create).is_empty());
        assert_eq!(
            schema.check_advisory(&jpeg(1025, "image/jpeg"), Mode::Create).get("image"),
            Some("The image field must not be greater than 1 kilobytes.")
        );
        assert_eq!(
            schema.check_advisory(&jpeg(10, "image/gif"), Mode::Create).get("image"),
            Some("The image field must be a file of type: jpeg, png, jpg, webp.")
        );

        let text = FormInput::new().with_text("image", "not a file");
        assert_eq!(
            schema.check_advisory(&text, Mode::Create).get("image"),
            Some("The image field must be an image.")
        );

        let gif = FormInput::new().with_file("image", UploadedFile::new("a.gif", "image/jpeg", b"GIF89a".to_vec()));
        assert_eq!(
            schema.check_advisory(&gif, Mode::Create).get("image"),
            Some("The image field must be an image.")
        );
    }

    #[test]
    fn field_errors_serialize_as_ordered_map() {
        let mut errors = FieldErrors::new();
        errors.insert("slug", "first");
        errors.insert("name", "second");
        errors.insert("slug", "ignored");
        assert_eq!(
            serde_json::to_string(&errors).unwrap(),
            r#"{"slug":"first","name":"second"}"#
        );
    }

    #[test]
    fn schema_serializes_rule_tags() {
        let json = serde_json::to_value(schema()).unwrap();
        assert_eq!(json["entity"], "Widget");
        assert_eq!(json["fields"][0]["rules"][2]["rule"], "max_length");
        assert_eq!(json["fields"][0]["rules"][2]["max"], 5);
        assert_eq!(json["fields"][1]["rules"][2]["table"], "widgets");
    }
}
