//! Mandatory validity windows.

use chrono::{Duration, Utc};

use super::MetadataFilter;
use crate::error::{MetadataError, MetadataResult};
use crate::metadata::EntityDescriptor;

const NAME: &str = "required_valid_until";

/// Rejects entities without `validUntil`, or whose window is too long.
#[derive(Debug, Clone, Default)]
pub struct RequiredValidUntilFilter {
    max_validity: Option<Duration>,
}

impl RequiredValidUntilFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject entities valid for longer than `max` from now.
    pub fn with_max_validity(mut self, max: Duration) -> Self {
        self.max_validity = Some(max);
        self
    }
}

impl MetadataFilter for RequiredValidUntilFilter {
    fn name(&self) -> &str {
        NAME
    }

    fn filter(&self, entity: EntityDescriptor) -> MetadataResult<Option<EntityDescriptor>> {
        let Some(valid_until) = entity.valid_until else {
            return Err(MetadataError::filtered(NAME, "validUntil is required"));
        };

        if let Some(max) = self.max_validity {
            let window = valid_until - Utc::now();
            if window > max {
                return Err(MetadataError::filtered(
                    NAME,
                    format!(
                        "validity of {}s exceeds maximum of {}s",
                        window.num_seconds(),
                        max.num_seconds()
                    ),
                ));
            }
        }

        Ok(Some(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_valid_until_rejected() {
        let result = RequiredValidUntilFilter::new().filter(EntityDescriptor::new("e"));
        assert!(matches!(result, Err(MetadataError::Filtered { .. })));
    }

    #[test]
    fn test_window_bound() {
        let filter = RequiredValidUntilFilter::new().with_max_validity(Duration::days(14));

        let short = EntityDescriptor::new("e").with_valid_until(Utc::now() + Duration::days(7));
        assert!(filter.filter(short).unwrap().is_some());

        let long = EntityDescriptor::new("e").with_valid_until(Utc::now() + Duration::days(30));
        assert!(filter.filter(long).is_err());
    }
}
