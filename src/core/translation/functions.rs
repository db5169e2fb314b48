//! Built-in translation functions

use super::{TranslationContext, TranslationFn};
use crate::core::reference_data::entity;
use crate::domain::TranslationError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};

/// Every built-in function by name
pub const BUILTIN: &[(&str, TranslationFn)] = &[
    ("set_value", set_value),
    ("set_transaction_datetime", set_transaction_datetime),
    ("set_fixed_length_data_elements", set_fixed_length_data_elements),
    ("set_instance_type_id", set_instance_type_id),
    ("set_instance_format_id", set_instance_format_id),
    ("set_material_type", set_material_type),
    ("set_loan_type", set_loan_type),
    ("set_call_number_type_id", set_call_number_type_id),
    ("set_contributor_name_type_id", set_contributor_name_type_id),
    ("set_identifier_type_id", set_identifier_type_id),
    ("set_permanent_location", set_location),
    ("set_temporary_location", set_location),
    ("set_effective_location", set_location),
    ("set_electronic_access_indicator", set_electronic_access_indicator),
];

const BLANK_DATE_YEAR: &str = "    ";
const UNDETERMINED_LANGUAGE: &str = "und";

fn missing_parameter(function: &str, parameter: &str) -> TranslationError {
    TranslationError::MissingParameter {
        function: function.to_string(),
        parameter: parameter.to_string(),
    }
}

/// Constant from the `value` parameter; the input is ignored
pub fn set_value(_value: &str, ctx: &TranslationContext<'_>) -> Result<String, TranslationError> {
    ctx.parameter("value")
        .map(str::to_string)
        .ok_or_else(|| missing_parameter("set_value", "value"))
}

/// Parse the date forms found in catalog records into UTC
fn parse_datetime(value: &str) -> Result<DateTime<Utc>, TranslationError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(TranslationError::InvalidDate(value.to_string()))
}

/// `yyyyMMddHHmmss.f` as used by the 005 field
pub fn set_transaction_datetime(
    value: &str,
    _ctx: &TranslationContext<'_>,
) -> Result<String, TranslationError> {
    let dt = parse_datetime(value)?;
    let tenths = dt.nanosecond() % 1_000_000_000 / 100_000_000;
    Ok(format!("{}.{tenths}", dt.format("%Y%m%d%H%M%S")))
}

/// First run of four digits, e.g. `2004` in `c2004-2005`
fn first_year(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut run = 0;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            run += 1;
            if run == 4 {
                return Some(&text[i + 1 - 4..=i]);
            }
        } else {
            run = 0;
        }
    }
    None
}

/// The 40 character 008 field of a bibliographic record
///
/// The input is the record creation date. `dateOfPublication` and `language`
/// come from the rule metadata.
pub fn set_fixed_length_data_elements(
    value: &str,
    ctx: &TranslationContext<'_>,
) -> Result<String, TranslationError> {
    let created = parse_datetime(value)?.format("%y%m%d").to_string();

    let (date_type, date1) = match ctx.metadata("dateOfPublication").and_then(first_year) {
        Some(year) => ('s', year),
        None => ('|', BLANK_DATE_YEAR),
    };

    let language = ctx
        .metadata("language")
        .filter(|l| l.chars().count() == 3)
        .unwrap_or(UNDETERMINED_LANGUAGE);

    let mut field = String::with_capacity(40);
    field.push_str(&created);
    field.push(date_type);
    field.push_str(date1);
    field.push_str(BLANK_DATE_YEAR);
    field.push_str("xx ");
    field.push_str(&" ".repeat(17));
    field.push_str(language);
    field.push(' ');
    field.push('d');
    Ok(field)
}

fn lookup_name(value: &str, ctx: &TranslationContext<'_>, table: &str) -> Result<String, TranslationError> {
    ctx.reference_data
        .attribute(table, value.trim(), "name")
        .map(str::to_string)
        .ok_or_else(|| TranslationError::ReferenceNotFound {
            entity: table.to_string(),
            id: value.to_string(),
        })
}

/// Instance type name
pub fn set_instance_type_id(value: &str, ctx: &TranslationContext<'_>) -> Result<String, TranslationError> {
    lookup_name(value, ctx, entity::INSTANCE_TYPES)
}

/// Instance format name
pub fn set_instance_format_id(value: &str, ctx: &TranslationContext<'_>) -> Result<String, TranslationError> {
    lookup_name(value, ctx, entity::INSTANCE_FORMATS)
}

/// Material type name
pub fn set_material_type(value: &str, ctx: &TranslationContext<'_>) -> Result<String, TranslationError> {
    lookup_name(value, ctx, entity::MATERIAL_TYPES)
}

/// Loan type name
pub fn set_loan_type(value: &str, ctx: &TranslationContext<'_>) -> Result<String, TranslationError> {
    lookup_name(value, ctx, entity::LOAN_TYPES)
}

/// Call number type name
pub fn set_call_number_type_id(value: &str, ctx: &TranslationContext<'_>) -> Result<String, TranslationError> {
    lookup_name(value, ctx, entity::CALL_NUMBER_TYPES)
}

/// Contributor name type name
pub fn set_contributor_name_type_id(
    value: &str,
    ctx: &TranslationContext<'_>,
) -> Result<String, TranslationError> {
    lookup_name(value, ctx, entity::CONTRIBUTOR_NAME_TYPES)
}

/// Identifier type name
pub fn set_identifier_type_id(value: &str, ctx: &TranslationContext<'_>) -> Result<String, TranslationError> {
    lookup_name(value, ctx, entity::IDENTIFIER_TYPES)
}

/// Location attribute selected by the `field` parameter
///
/// `name` and `code` (or any other plain attribute) read the location itself.
/// `libraryName`, `campusCode`, `institutionName` and the like follow the
/// location's `libraryId`, `campusId` or `institutionId` link first.
pub fn set_location(value: &str, ctx: &TranslationContext<'_>) -> Result<String, TranslationError> {
    let id = value.trim();
    let field = ctx.parameter("field").unwrap_or("name");
    let data = ctx.reference_data;
    let not_found = |entity: &str, id: &str| TranslationError::ReferenceNotFound {
        entity: entity.to_string(),
        id: id.to_string(),
    };

    let linked = [
        ("library", "libraryId", entity::LIBRARIES),
        ("campus", "campusId", entity::CAMPUSES),
        ("institution", "institutionId", entity::INSTITUTIONS),
    ]
    .into_iter()
    .find_map(|(prefix, link, table)| {
        let rest = field.strip_prefix(prefix)?;
        let mut chars = rest.chars();
        let first = chars.next()?.to_ascii_lowercase();
        Some((link, table, format!("{first}{}", chars.as_str())))
    });

    match linked {
        Some((link, table, attribute)) => {
            let linked_id = data
                .attribute(entity::LOCATIONS, id, link)
                .ok_or_else(|| not_found(entity::LOCATIONS, id))?;
            data.attribute(table, linked_id, &attribute)
                .map(str::to_string)
                .ok_or_else(|| not_found(table, linked_id))
        }
        None => data
            .attribute(entity::LOCATIONS, id, field)
            .map(str::to_string)
            .ok_or_else(|| not_found(entity::LOCATIONS, id)),
    }
}

/// Second indicator of an 856 field from the electronic access relationship
///
/// Unknown relationships give a blank indicator.
pub fn set_electronic_access_indicator(
    value: &str,
    ctx: &TranslationContext<'_>,
) -> Result<String, TranslationError> {
    let name = ctx
        .reference_data
        .attribute(entity::ELECTRONIC_ACCESS_RELATIONSHIPS, value.trim(), "name")
        .unwrap_or_default();
    let indicator = match name.to_ascii_lowercase().as_str() {
        "resource" => "0",
        "version of resource" => "1",
        "related resource" => "2",
        "no display constant generated" => "8",
        _ => " ",
    };
    Ok(indicator.to_string())
}
