use crate::errors::LoadError;
use crate::save::DocumentData;

/// Apply format migrations from `from_version` to `to_version`.
///
/// Migrations run one version step at a time. Version 1 is the only
/// version so far, so any real step is an error.
pub fn migrate(
    document: DocumentData,
    from_version: u32,
    to_version: u32,
) -> Result<DocumentData, LoadError> {
    if from_version != to_version {
        return Err(LoadError::MigrationFailed {
            from: from_version,
            to: to_version,
            reason: format!("no migration path from v{from_version} to v{to_version}"),
        });
    }
    Ok(document)
}
