//! One configured cover: identity, controller and debouncer.

use tracing::info;

use crate::commands::{CommandOutcome, CoverCommand};
use crate::config::CoverConfig;
use crate::controller::MoveController;
use crate::debounce::RequestDebouncer;
use crate::error::CoverError;
use crate::state::CoverSnapshot;
use crate::traits::CommandSink;

/// A cover as the services see it.
///
/// Open, close and stop go straight to the controller and drop any position
/// request still waiting in the debouncer. Position requests go through the
/// debouncer.
///
/// Dropping a cover has the same effect as [`Cover::shutdown`], except that
/// the teardown finishes on the runtime after the drop returns.
pub struct Cover<S: CommandSink> {
    id: String,
    name: String,
    controller: MoveController<S>,
    debouncer: RequestDebouncer<S>,
}

impl<S: CommandSink> Cover<S> {
    /// Build a cover from its config.
    ///
    /// The config is validated and the starting position restored from
    /// `initial_position`.
    pub fn new(config: &CoverConfig, sink: S) -> Result<Self, CoverError> {
        let controller = MoveController::new(config, sink)?;
        let debouncer = RequestDebouncer::new(controller.clone(), config.debounce_window());
        info!(
            cover = %config.id,
            name = %config.name,
            position = controller.position(),
            "cover ready"
        );
        Ok(Self {
            id: config.id.clone(),
            name: config.name.clone(),
            controller,
            debouncer,
        })
    }

    /// Stable id, used in URLs and topics.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The controller driving this cover.
    pub fn controller(&self) -> &MoveController<S> {
        &self.controller
    }

    /// The debouncer in front of the controller.
    pub fn debouncer(&self) -> &RequestDebouncer<S> {
        &self.debouncer
    }

    /// Current presentation view.
    pub fn snapshot(&self) -> CoverSnapshot {
        self.controller.snapshot()
    }

    /// Apply a command.
    pub async fn apply(&self, command: CoverCommand) -> Result<CommandOutcome, CoverError> {
        if command.is_immediate() {
            self.debouncer.cancel().await;
        }
        match command {
            CoverCommand::Open => Ok(CommandOutcome::Moved {
                result: self.controller.open().await?,
            }),
            CoverCommand::Close => Ok(CommandOutcome::Moved {
                result: self.controller.close().await?,
            }),
            CoverCommand::Stop => Ok(CommandOutcome::Stopped {
                interrupted: self.controller.stop().await?,
            }),
            CoverCommand::SetPosition(target) => {
                let token = self.debouncer.request_position(f64::from(target));
                Ok(CommandOutcome::Scheduled { token, target })
            }
        }
    }

    /// Drop any pending request and cancel the running move.
    ///
    /// No pulse is sent; the motor is left to whatever it was doing.
    pub async fn shutdown(&self) {
        self.debouncer.cancel().await;
        self.controller.shutdown().await;
    }
}
