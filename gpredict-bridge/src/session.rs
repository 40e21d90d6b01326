use crate::{
    command::{Command, LineBuffer},
    controller::Controller,
};
use bus::{Event, Publisher};
use log::Level;
use std::{
    io::{ErrorKind, Read, Write},
    sync::atomic::{AtomicBool, Ordering},
};

/// Bytes requested from the socket per read.
pub const READ_BUFFER_SIZE: usize = 1024;

pub const ACK: &str = "RPRT 0\n";
pub const NACK: &str = "RPRT -1\n";

/// What a controller may do while handling one command.
pub struct Context<'a> {
    writer: &'a mut dyn Write,
    publisher: &'a dyn Publisher,
    component: &'static str,
    level: Level,
}

impl<'a> Context<'a> {
    pub fn new(
        writer: &'a mut dyn Write,
        publisher: &'a dyn Publisher,
        component: &'static str,
        level: Level,
    ) -> Self {
        Self {
            writer,
            publisher,
            component,
            level,
        }
    }

    /// Writes `text` to the client. Failures are logged and swallowed.
    pub fn reply(&mut self, text: &str) {
        let result = self
            .writer
            .write_all(text.as_bytes())
            .and_then(|_| self.writer.flush());

        if let Err(e) = result {
            log::warn!("[{}] failed to send reply: {}", self.component, e);
        }
    }

    pub fn ack(&mut self) {
        self.reply(ACK);
    }

    pub fn nack(&mut self) {
        self.reply(NACK);
    }

    /// Publishes `event`. A bus failure never ends the session.
    pub fn publish(&self, event: Event) {
        let topic = event.topic();

        if let Err(e) = self.publisher.publish(event) {
            log::warn!("[{}] failed to publish on {}: {}", self.component, topic, e);
        }
    }

    pub fn publisher(&self) -> &dyn Publisher {
        self.publisher
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    /// Level for per-command diagnostics.
    pub fn level(&self) -> Level {
        self.level
    }
}

/// Serves one connection until the client goes away or `stop` is raised.
///
/// The stop flag is looked at after every read, so data that arrives
/// together with a shutdown is dropped rather than executed.
pub fn run<S, C>(
    stream: &mut S,
    controller: &mut C,
    publisher: &dyn Publisher,
    stop: &AtomicBool,
    level: Level,
) where
    S: Read + Write,
    C: Controller + ?Sized,
{
    let component = controller.name();
    let mut buffer = [0u8; READ_BUFFER_SIZE];
    let mut lines = LineBuffer::new();

    loop {
        let read = match stream.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                log::debug!("[{}] read failed: {}", component, e);
                break;
            }
        };

        if stop.load(Ordering::SeqCst) {
            break;
        }

        let mut context = Context::new(stream, publisher, component, level);
        for line in lines.feed(&buffer[..read]) {
            dispatch(controller, &line, &mut context);
        }
    }

    if !lines.pending().is_empty() {
        log::debug!(
            "[{}] discarding unterminated command {:?}",
            component,
            String::from_utf8_lossy(lines.pending())
        );
    }
}

fn dispatch<C>(controller: &mut C, line: &str, context: &mut Context<'_>)
where
    C: Controller + ?Sized,
{
    match controller.grammar().parse(line) {
        Ok(Command::Unknown(text)) => {
            log::warn!("[{}] unknown command: {}", context.component(), text);
            context.ack();
        }
        Ok(command) => {
            log::log!(context.level(), "[{}] {:?}", context.component(), command);
            controller.handle(command, context);
        }
        Err(e) => {
            log::warn!("[{}] rejected `{}`: {}", context.component(), line, e);
            context.nack();
        }
    }
}

/// In-memory stream and publisher that record replies and events on one
/// journal, so tests can check their relative order.
#[cfg(test)]
pub(crate) mod testing {
    use bus::{BusError, Event, Publisher};
    use std::{
        collections::VecDeque,
        io::{self, Read, Write},
        sync::{Arc, Mutex},
    };

    #[derive(Debug, Clone, PartialEq)]
    pub enum Entry {
        Reply(String),
        Event(Event),
    }

    #[derive(Debug, Clone, Default)]
    pub struct Journal(Arc<Mutex<Vec<Entry>>>);

    impl Journal {
        pub fn entries(&self) -> Vec<Entry> {
            self.0.lock().unwrap().clone()
        }

        pub fn events(&self) -> Vec<Event> {
            self.entries()
                .into_iter()
                .filter_map(|entry| match entry {
                    Entry::Event(event) => Some(event),
                    Entry::Reply(_) => None,
                })
                .collect()
        }

        pub fn replies(&self) -> String {
            self.entries()
                .into_iter()
                .filter_map(|entry| match entry {
                    Entry::Reply(text) => Some(text),
                    Entry::Event(_) => None,
                })
                .collect()
        }
    }

    impl Publisher for Journal {
        fn publish(&self, event: Event) -> Result<(), BusError> {
            self.0.lock().unwrap().push(Entry::Event(event));
            Ok(())
        }
    }

    /// Hands out one scripted chunk per read, then end of stream.
    pub struct ScriptedStream {
        reads: VecDeque<io::Result<Vec<u8>>>,
        journal: Journal,
        broken: bool,
    }

    impl ScriptedStream {
        pub fn new(journal: &Journal, reads: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into(),
                journal: journal.clone(),
                broken: false,
            }
        }

        /// Every write fails with `BrokenPipe`, as after the peer half-closed.
        pub fn broken(mut self) -> Self {
            self.broken = true;
            self
        }

        pub fn chunks(journal: &Journal, chunks: &[&str]) -> Self {
            Self::new(
                journal,
                chunks.iter().map(|chunk| Ok(chunk.as_bytes().to_vec())).collect(),
            )
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.broken {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            let text = String::from_utf8_lossy(buf).into_owned();
            self.journal.0.lock().unwrap().push(Entry::Reply(text));
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
