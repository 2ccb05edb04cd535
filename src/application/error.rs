use std::error::Error as StdError;

use thiserror::Error;

use crate::{application::repos::StoreError, config::LoadError, infra::error::InfraError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error("resource not found")]
    NotFound,
    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

impl AppError {
    /// Process exit status for the binary, following sysexits(3).
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::NotFound => 1,
            AppError::Config(_) | AppError::Infra(InfraError::Configuration { .. }) => 78,
            AppError::Infra(InfraError::Database { .. }) | AppError::Store(StoreError::Timeout) => {
                69
            }
            AppError::Store(StoreError::InvalidInput { .. } | StoreError::Query(_)) => 65,
            AppError::Store(_)
            | AppError::Infra(InfraError::Migration { .. } | InfraError::Telemetry(_))
            | AppError::Output(_) => 70,
        }
    }

    /// The error and each of its sources, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut current = self.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        messages
    }
}
