//! Protocol variants served by the bridge.

mod azel_limit;
mod doppler;
mod rotor;
mod velocity;

pub use azel_limit::AzElGate;
pub use doppler::DopplerController;
pub use rotor::RotorController;
pub use velocity::{VelocityController, VelocityHandle};

use crate::{
    command::{Command, Grammar},
    session::Context,
};
use bus::Publisher;

/// State and command handling of one Hamlib protocol variant.
///
/// The server owns the controller on its worker thread. Commands arrive in
/// the order the client sent them, already parsed with
/// [`grammar`](Controller::grammar); unknown and malformed lines never reach
/// [`handle`](Controller::handle).
pub trait Controller: Send + 'static {
    fn grammar(&self) -> &'static Grammar;

    /// Component name used in logs and as the worker thread name.
    fn name(&self) -> &'static str {
        self.grammar().name
    }

    /// Runs once on the worker, before the first connection is accepted.
    fn on_start(&mut self, _publisher: &dyn Publisher) {}

    /// Runs for every accepted connection, before its first command.
    fn on_connect(&mut self) {}

    fn handle(&mut self, command: Command, context: &mut Context<'_>);
}

/// Answer for a command the grammar produced but the controller does not
/// act on.
fn ignore(command: Command, context: &mut Context<'_>) {
    log::debug!("[{}] ignoring {:?}", context.component(), command);
    context.ack();
}
