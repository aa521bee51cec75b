use zcs_domain::query::QueryReject;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("{message}")]
	FeatureDisabled { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Remote error: {message}")]
	Remote { message: String },
}
impl From<zcs_storage::Error> for Error {
	fn from(err: zcs_storage::Error) -> Self {
		match err {
			zcs_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			zcs_storage::Error::NotFound(message) => Self::NotFound { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

impl From<zcs_index::Error> for Error {
	fn from(err: zcs_index::Error) -> Self {
		Self::Remote { message: err.to_string() }
	}
}

impl From<QueryReject> for Error {
	fn from(reject: QueryReject) -> Self {
		Self::InvalidRequest { message: reject.message().to_string() }
	}
}
