//! Static feature and churn analyzers feeding the session snapshot.

pub mod churn;
pub mod statics;
