//! # Validation Module
//!
//! Identifier and mapping validation for the tally bridge.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Mapping editor / config file                                 │
//! │  └── Raw strings: { "Input8": "XCU-08", ... }                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── source ids: lowercase, [a-z0-9_-], ≤ 64 chars                     │
//! │  └── unit ids:   [A-Za-z0-9_-], ≤ 32 chars                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: BridgeContext::replace_mapping                               │
//! │  └── Only a fully validated CameraUnitMapping is ever swapped in       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_source_id, validate_unit_id};
//!
//! assert_eq!(validate_source_id(" Input8 ").unwrap(), "input8");
//! assert!(validate_unit_id("XCU-08").is_ok());
//! assert!(validate_unit_id("XCU 08").is_err());
//! ```

use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::types::{CameraUnitMapping, SourceId, UnitId};
use crate::{MAX_SOURCE_ID_LEN, MAX_UNIT_ID_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a switcher source identifier and returns its normalized form.
///
/// ## Rules
/// - Surrounding whitespace is ignored
/// - Must not be empty, at most 64 characters
/// - Letters, digits, hyphens and underscores only
/// - Normalized to lowercase (`Input1` and `input1` are the same source)
pub fn validate_source_id(id: &str) -> ValidationResult<String> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "source id".to_string(),
        });
    }

    if id.len() > MAX_SOURCE_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "source id".to_string(),
            max: MAX_SOURCE_ID_LEN,
        });
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "source id".to_string(),
            reason: format!(
                "'{id}' must contain only letters, numbers, hyphens, and underscores"
            ),
        });
    }

    Ok(id.to_ascii_lowercase())
}

/// Validates a camera control unit identifier.
///
/// ## Rules
/// - Surrounding whitespace is ignored
/// - Must not be empty, at most 32 characters
/// - Letters, digits, hyphens and underscores only
/// - Case is preserved (`XCU-08` is the vendor's spelling)
pub fn validate_unit_id(id: &str) -> ValidationResult<String> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: "unit id".to_string(),
        });
    }

    if id.len() > MAX_UNIT_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "unit id".to_string(),
            max: MAX_UNIT_ID_LEN,
        });
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "unit id".to_string(),
            reason: format!(
                "'{id}' must contain only letters, numbers, hyphens, and underscores"
            ),
        });
    }

    Ok(id.to_string())
}

// =============================================================================
// Mapping Validators
// =============================================================================

/// Validates a raw `source → unit` map into a [`CameraUnitMapping`].
///
/// Every key and value is checked; the first offending entry is reported and
/// nothing is returned, so callers never see a partially valid mapping.
///
/// ## Example
/// ```rust
/// use std::collections::BTreeMap;
/// use tally_core::validation::validate_mapping;
///
/// let mut raw = BTreeMap::new();
/// raw.insert("Input8".to_string(), "XCU-08".to_string());
/// raw.insert("input9".to_string(), "XCU-08".to_string()); // many-to-one is fine
///
/// let mapping = validate_mapping(&raw).unwrap();
/// assert_eq!(mapping.len(), 2);
/// assert_eq!(mapping.units().len(), 1);
/// ```
pub fn validate_mapping(raw: &BTreeMap<String, String>) -> ValidationResult<CameraUnitMapping> {
    let mut mapping = CameraUnitMapping::new();

    for (source, unit) in raw {
        let source_id = SourceId::new(source)?;
        let unit_id = UnitId::new(unit)?;

        if mapping.contains_source(&source_id) {
            return Err(ValidationError::Duplicate {
                field: "source id".to_string(),
                value: source_id.to_string(),
            });
        }

        mapping.insert(source_id, unit_id);
    }

    Ok(mapping)
}

// =============================================================================
// Unit Tests
// =============================================================================
