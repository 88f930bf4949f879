use thiserror::Error;

/// Why a single alignment record could not be turned into a [`ReadPosition`].
///
/// [`ReadPosition`]: crate::molecule::ReadPosition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("missing barcode tag {tag}")]
    MissingBarcode { tag: String },

    #[error("barcode tag {tag} is not a string")]
    UnsupportedBarcodeType { tag: String },

    #[error("empty barcode")]
    EmptyBarcode,

    #[error("no reference sequence")]
    MissingReference,

    #[error("negative position {0}")]
    NegativePosition(i64),
}

/// Errors raised while partitioning reads into molecules.
#[derive(Debug, Error)]
pub enum MoleculeError {
    /// A single record was rejected; the stream itself is still usable.
    #[error("malformed record {read_name}: {reason}")]
    MalformedRecord {
        read_name: String,
        reason: MalformedReason,
    },

    /// Raised only in sorted-input mode.
    #[error(
        "barcode {barcode} is not coordinate-sorted on {reference}: {position} follows {previous}"
    )]
    UnsortedInput {
        barcode: String,
        reference: String,
        previous: u64,
        position: u64,
    },

    #[error("failed to read alignment records")]
    Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to write molecule output")]
    Downstream(#[from] std::io::Error),
}

impl MoleculeError {
    pub fn malformed(read_name: impl Into<String>, reason: MalformedReason) -> Self {
        MoleculeError::MalformedRecord {
            read_name: read_name.into(),
            reason,
        }
    }

    /// Fatal errors end the stream; nothing further is emitted after one.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MoleculeError::Upstream(_) | MoleculeError::Downstream(_))
    }
}
