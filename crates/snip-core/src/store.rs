use crate::error::{Result, StorageError};
use crate::mapping::UrlMapping;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::sync::Arc;

/// Mapping attributes that may change after creation.
///
/// The key, `long_url` and `created_at` are immutable once written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricField {
    LastAccessed,
    ExpiresAt,
    NumClicks,
}

impl MetricField {
    /// The attribute name as persisted by the stores.
    pub fn column(&self) -> &'static str {
        match self {
            MetricField::LastAccessed => "last_accessed",
            MetricField::ExpiresAt => "expires_at",
            MetricField::NumClicks => "num_clicks",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    /// Overwrite with an absolute value.
    Set(i64),
    /// Add to the current value, treating a missing value as 0.
    Increment(i64),
    /// Raise to the operand, never lowering the current value.
    AtLeast(i64),
}

impl UpdateOp {
    /// The operand carried by the operation.
    pub fn value(&self) -> i64 {
        match *self {
            UpdateOp::Set(value) | UpdateOp::Increment(value) | UpdateOp::AtLeast(value) => {
                value
            }
        }
    }

    fn apply(self, field: MetricField, current: i64) -> Result<i64> {
        match self {
            UpdateOp::Set(value) => Ok(value),
            UpdateOp::Increment(delta) => current.checked_add(delta).ok_or_else(|| {
                StorageError::InvalidData(format!("{} overflowed", field.column()))
            }),
            UpdateOp::AtLeast(floor) => Ok(current.max(floor)),
        }
    }
}

/// A set of field updates applied to one mapping in a single atomic step.
///
/// Operations run in insertion order against the same record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingUpdate {
    ops: Vec<(MetricField, UpdateOp)>,
}

impl MappingUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: MetricField, value: i64) -> Self {
        self.ops.push((field, UpdateOp::Set(value)));
        self
    }

    pub fn increment(mut self, field: MetricField, by: i64) -> Self {
        self.ops.push((field, UpdateOp::Increment(by)));
        self
    }

    /// Moves `field` up to `value` unless it is already higher.
    pub fn at_least(mut self, field: MetricField, value: i64) -> Self {
        self.ops.push((field, UpdateOp::AtLeast(value)));
        self
    }

    pub fn ops(&self) -> &[(MetricField, UpdateOp)] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Applies every operation to `mapping`, all or nothing.
    ///
    /// Stores without a native update expression call this while holding
    /// the key's write lock.
    pub fn apply_to(&self, mapping: &mut UrlMapping) -> Result<()> {
        let mut next = mapping.clone();

        for &(field, op) in &self.ops {
            match field {
                MetricField::LastAccessed => {
                    next.last_accessed = op.apply(field, next.last_accessed)?;
                }
                MetricField::ExpiresAt => {
                    next.expires_at = op.apply(field, next.expires_at)?;
                }
                MetricField::NumClicks => {
                    let current = i64::try_from(next.num_clicks).map_err(|_| {
                        StorageError::InvalidData("num_clicks exceeds i64 range".to_string())
                    })?;
                    next.num_clicks = u64::try_from(op.apply(field, current)?).map_err(|_| {
                        StorageError::InvalidData("num_clicks cannot be negative".to_string())
                    })?;
                }
            }
        }

        *mapping = next;
        Ok(())
    }
}

/// The minimal contract the engine needs from a backing key-value store.
///
/// Every call touches exactly one key. Implementations must make `create`
/// a conditional insert and `atomic_update` a single atomic step; the engine
/// never locks and never performs read-modify-write on its own.
#[async_trait]
pub trait MappingStore: Send + Sync + 'static {
    /// Inserts a new mapping keyed by its short code.
    ///
    /// Returns `Err(StorageError::Conflict)` if a live mapping already owns the code.
    async fn create(&self, mapping: UrlMapping) -> Result<()>;

    /// Retrieves the mapping for a given short code.
    /// Returns `None` if the code does not exist or has expired.
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlMapping>>;

    /// Retrieves only the redirect target for a given short code.
    async fn get_long_url(&self, code: &ShortCode) -> Result<Option<String>> {
        Ok(self.get(code).await?.map(|mapping| mapping.long_url))
    }

    /// Atomically applies `update` to the mapping for `code`.
    ///
    /// Returns `false` if there is no live mapping to update.
    async fn atomic_update(&self, code: &ShortCode, update: MappingUpdate) -> Result<bool>;
}

#[async_trait]
impl<T: MappingStore + ?Sized> MappingStore for Arc<T> {
    async fn create(&self, mapping: UrlMapping) -> Result<()> {
        (**self).create(mapping).await
    }

    async fn get(&self, code: &ShortCode) -> Result<Option<UrlMapping>> {
        (**self).get(code).await
    }

    async fn get_long_url(&self, code: &ShortCode) -> Result<Option<String>> {
        (**self).get_long_url(code).await
    }

    async fn atomic_update(&self, code: &ShortCode, update: MappingUpdate) -> Result<bool> {
        (**self).atomic_update(code, update).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::{SignedDuration, Timestamp};

    fn mapping() -> UrlMapping {
        UrlMapping::new(
            ShortCode::new("abc123").unwrap(),
            "https://example.com",
            Timestamp::from_second(1_000).unwrap(),
            SignedDuration::from_secs(100),
        )
    }

    #[test]
    fn set_and_increment_apply_in_order() {
        let mut record = mapping();
        let update = MappingUpdate::new()
            .set(MetricField::LastAccessed, 1_050)
            .increment(MetricField::NumClicks, 1)
            .increment(MetricField::NumClicks, 2)
            .set(MetricField::ExpiresAt, 1_150);

        update.apply_to(&mut record).unwrap();

        assert_eq!(record.last_accessed, 1_050);
        assert_eq!(record.num_clicks, 3);
        assert_eq!(record.expires_at, 1_150);
        assert_eq!(record.created_at, 1_000);
    }

    #[test]
    fn failed_update_leaves_record_untouched() {
        let mut record = mapping();
        let before = record.clone();
        let update = MappingUpdate::new()
            .set(MetricField::LastAccessed, 1_050)
            .increment(MetricField::NumClicks, -1);

        let err = update.apply_to(&mut record).unwrap_err();

        assert!(matches!(err, StorageError::InvalidData(_)));
        assert_eq!(record, before);
    }

    #[test]
    fn increment_overflow_is_invalid_data() {
        let mut record = mapping();
        let update = MappingUpdate::new().increment(MetricField::ExpiresAt, i64::MAX);

        assert!(matches!(
            update.apply_to(&mut record),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[test]
    fn at_least_never_lowers_a_field() {
        let mut record = mapping();
        assert_eq!(record.expires_at, 1_100);

        MappingUpdate::new()
            .at_least(MetricField::ExpiresAt, 1_050)
            .apply_to(&mut record)
            .unwrap();
        assert_eq!(record.expires_at, 1_100);

        MappingUpdate::new()
            .at_least(MetricField::ExpiresAt, 1_200)
            .apply_to(&mut record)
            .unwrap();
        assert_eq!(record.expires_at, 1_200);
    }

    #[test]
    fn columns_match_persisted_names() {
        assert_eq!(MetricField::LastAccessed.column(), "last_accessed");
        assert_eq!(MetricField::ExpiresAt.column(), "expires_at");
        assert_eq!(MetricField::NumClicks.column(), "num_clicks");
    }

    #[test]
    fn empty_update_is_a_no_op() {
        let mut record = mapping();
        let before = record.clone();
        let update = MappingUpdate::new();

        assert!(update.is_empty());
        update.apply_to(&mut record).unwrap();
        assert_eq!(record, before);
    }
}
