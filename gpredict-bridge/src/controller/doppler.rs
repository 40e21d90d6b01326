use super::{Controller, ignore};
use crate::{
    command::{Command, DOPPLER_GRAMMAR, Grammar},
    session::Context,
};
use bus::Event;

/// Radio side of the tracking client: receive and transmit frequencies plus
/// AOS/LOS notifications.
///
/// The last commanded frequencies survive a reconnect, so a client that
/// comes back with the same frequency does not trigger a new event.
#[derive(Debug, Default)]
pub struct DopplerController {
    frequency: i64,
    tx_frequency: i64,
}

impl DopplerController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frequency(&self) -> i64 {
        self.frequency
    }

    pub fn tx_frequency(&self) -> i64 {
        self.tx_frequency
    }
}

impl Controller for DopplerController {
    fn grammar(&self) -> &'static Grammar {
        &DOPPLER_GRAMMAR
    }

    fn handle(&mut self, command: Command, context: &mut Context<'_>) {
        match command {
            Command::SetFrequency(freq) => {
                if freq != self.frequency {
                    log::log!(context.level(), "[doppler] new frequency: {}", freq);
                    self.frequency = freq;
                    context.publish(Event::Frequency(freq as f64));
                }
                context.ack();
            }
            Command::GetFrequency => context.reply(&format!("f: {}\n", self.frequency)),
            Command::SetTxFrequency(freq) => {
                if freq != self.tx_frequency {
                    log::log!(context.level(), "[doppler] new tx frequency: {}", freq);
                    self.tx_frequency = freq;
                    context.publish(Event::TxFrequency(freq as f64));
                }
                context.ack();
            }
            Command::GetTxFrequency => context.reply(&format!("i: {}\n", self.tx_frequency)),
            Command::Split => context.ack(),
            Command::Aos => {
                log::log!(context.level(), "[doppler] received AOS");
                context.ack();
                context.publish(Event::State(true));
            }
            Command::Los => {
                log::log!(context.level(), "[doppler] received LOS");
                context.ack();
                context.publish(Event::State(false));
            }
            // Sent by the client right before it disconnects.
            Command::Quit => {}
            other => ignore(other, context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{
        self,
        testing::{Entry, Journal, ScriptedStream},
    };
    use log::Level;
    use std::sync::atomic::AtomicBool;

    fn serve(controller: &mut DopplerController, chunks: &[&str]) -> Journal {
        let journal = Journal::default();
        let mut stream = ScriptedStream::chunks(&journal, chunks);
        session::run(
            &mut stream,
            controller,
            &journal,
            &AtomicBool::new(false),
            Level::Debug,
        );
        journal
    }

    #[test]
    fn one_read_with_three_commands_keeps_order() {
        let mut controller = DopplerController::new();

        let journal = serve(&mut controller, &["F100\nAOS\nf\n"]);

        assert_eq!(
            journal.entries(),
            vec![
                Entry::Event(Event::Frequency(100.0)),
                Entry::Reply("RPRT 0\n".to_string()),
                Entry::Reply("RPRT 0\n".to_string()),
                Entry::Event(Event::State(true)),
                Entry::Reply("f: 100\n".to_string()),
            ]
        );
    }

    #[test]
    fn frequency_event_only_on_change() {
        let mut controller = DopplerController::new();

        let journal = serve(
            &mut controller,
            &["F100\nF100\nF200\nF200\nF100\n", "F0\n"],
        );

        assert_eq!(
            journal.events(),
            vec![
                Event::Frequency(100.0),
                Event::Frequency(200.0),
                Event::Frequency(100.0),
                Event::Frequency(0.0),
            ]
        );
        assert_eq!(journal.replies(), "RPRT 0\n".repeat(6));
    }

    #[test]
    fn tx_frequency_is_tracked_separately() {
        let mut controller = DopplerController::new();

        let journal = serve(&mut controller, &["I145990000\nF437500000\ni\nf\nI145990000\n"]);

        assert_eq!(
            journal.events(),
            vec![
                Event::TxFrequency(145_990_000.0),
                Event::Frequency(437_500_000.0),
            ]
        );
        assert_eq!(
            journal.replies(),
            "RPRT 0\nRPRT 0\ni: 145990000\nf: 437500000\nRPRT 0\n"
        );
    }

    #[test]
    fn los_is_not_change_gated_and_quit_is_silent() {
        let mut controller = DopplerController::new();

        let journal = serve(&mut controller, &["LOS\nLOS\nS\nq\n"]);

        assert_eq!(
            journal.events(),
            vec![Event::State(false), Event::State(false)]
        );
        assert_eq!(journal.replies(), "RPRT 0\n".repeat(3));
    }

    #[test]
    fn frequency_persists_across_sessions() {
        let mut controller = DopplerController::new();

        serve(&mut controller, &["F437500000\n"]);
        controller.on_connect();
        let journal = serve(&mut controller, &["f\nF437500000\n"]);

        assert!(journal.events().is_empty());
        assert_eq!(journal.replies(), "f: 437500000\nRPRT 0\n");
    }
}
