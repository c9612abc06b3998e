//! transfer/coordinator.rs
//! Owns the collaborators every transfer needs: the transport, the shared
//! transfer registry and the tuning config. Upload lives in `upload.rs`,
//! staging and reassembly in `download.rs`.

use std::sync::Arc;

use crate::config::TransferConfig;
use crate::transfer::registry::TransferRegistry;
use crate::transfer::transport::Transport;
use crate::types::TransferError;

pub struct TransferCoordinator {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) registry: Arc<TransferRegistry>,
    pub(crate) settings: TransferConfig,
}

impl TransferCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<TransferRegistry>,
        settings: TransferConfig,
    ) -> Result<Self, TransferError> {
        settings.validate()?;
        Ok(Self { transport, registry, settings })
    }

    pub fn settings(&self) -> &TransferConfig {
        &self.settings
    }

    pub fn registry(&self) -> &TransferRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}
