//! Streams of values flowing into and out of a running script.

use std::{
   collections::VecDeque,
   fmt,
   io,
   sync::Arc,
};

use arcstr::ArcStr;
use kiln_util::Dupe;
use parking_lot::Mutex;

use crate::{
   Result,
   Value,
};

/// Something values can be pulled from.
pub trait PipeSource: Send {
   fn name(&self) -> &str;

   /// The next value, `None` once the stream is exhausted.
   fn next(&mut self) -> Result<Option<Value>>;
}

/// Something values can be pushed to.
pub trait PipeSink: Send {
   fn name(&self) -> &str;

   fn emit(&mut self, value: &Value) -> Result<()>;
}

/// A shared handle to a [`PipeSource`].
#[derive(Clone)]
pub struct Source {
   name: ArcStr,
   pipe: Arc<Mutex<dyn PipeSource>>,
}

impl Dupe for Source {}

impl fmt::Debug for Source {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(writer, "Source({name:?})", name = self.name)
   }
}

impl fmt::Display for Source {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(writer, "<source: {name}>", name = self.name)
   }
}

impl PartialEq for Source {
   fn eq(&self, other: &Self) -> bool {
      Arc::ptr_eq(&self.pipe, &other.pipe)
   }
}

impl Source {
   #[must_use]
   pub fn new(source: impl PipeSource + 'static) -> Self {
      Self {
         name: ArcStr::from(source.name()),
         pipe: Arc::new(Mutex::new(source)),
      }
   }

   #[must_use]
   pub fn name(&self) -> &str {
      &self.name
   }

   pub fn next(&self) -> Result<Option<Value>> {
      self.pipe.lock().next()
   }
}

/// A shared handle to a [`PipeSink`].
#[derive(Clone)]
pub struct Sink {
   name: ArcStr,
   pipe: Arc<Mutex<dyn PipeSink>>,
}

impl Dupe for Sink {}

impl fmt::Debug for Sink {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(writer, "Sink({name:?})", name = self.name)
   }
}

impl fmt::Display for Sink {
   fn fmt(&self, writer: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(writer, "<sink: {name}>", name = self.name)
   }
}

impl PartialEq for Sink {
   fn eq(&self, other: &Self) -> bool {
      Arc::ptr_eq(&self.pipe, &other.pipe)
   }
}

impl Sink {
   #[must_use]
   pub fn new(sink: impl PipeSink + 'static) -> Self {
      Self {
         name: ArcStr::from(sink.name()),
         pipe: Arc::new(Mutex::new(sink)),
      }
   }

   #[must_use]
   pub fn name(&self) -> &str {
      &self.name
   }

   /// Pushes `value` into the pipe. The lock is held while the pipe encodes
   /// the value, so formatting any pipe must never take it.
   pub fn emit(&self, value: &Value) -> Result<()> {
      tracing::trace!(%value, "emitting value");
      self.pipe.lock().emit(value)
   }
}

/// Yields a fixed sequence of values.
#[derive(Debug, Default)]
pub struct InMemorySource {
   values: VecDeque<Value>,
}

impl InMemorySource {
   #[must_use]
   pub fn new(values: impl IntoIterator<Item = Value>) -> Self {
      Self {
         values: values.into_iter().collect(),
      }
   }
}

impl PipeSource for InMemorySource {
   fn name(&self) -> &str {
      "memory"
   }

   fn next(&mut self) -> Result<Option<Value>> {
      Ok(self.values.pop_front())
   }
}

/// Decodes a stream of concatenated or newline-delimited JSON documents.
pub struct JsonSource<R: io::Read> {
   name:   String,
   stream: serde_json::StreamDeserializer<'static, serde_json::de::IoRead<R>, Value>,
}

impl<R: io::Read> JsonSource<R> {
   #[must_use]
   pub fn new(name: impl Into<String>, reader: R) -> Self {
      Self {
         name:   name.into(),
         stream: serde_json::Deserializer::from_reader(reader).into_iter(),
      }
   }
}

impl<R: io::Read + Send> PipeSource for JsonSource<R> {
   fn name(&self) -> &str {
      &self.name
   }

   fn next(&mut self) -> Result<Option<Value>> {
      Ok(self.stream.next().transpose()?)
   }
}

/// Collects emitted values. Clones share the same storage, so a handle kept
/// outside the [`Sink`] can inspect what was emitted.
#[derive(Debug, Clone, Default)]
pub struct InMemorySink(Arc<Mutex<Vec<Value>>>);

impl InMemorySink {
   #[must_use]
   pub fn new() -> Self {
      Self::default()
   }

   #[must_use]
   pub fn values(&self) -> Vec<Value> {
      self.0.lock().clone()
   }
}

impl PipeSink for InMemorySink {
   fn name(&self) -> &str {
      "memory"
   }

   fn emit(&mut self, value: &Value) -> Result<()> {
      self.0.lock().push(value.dupe());
      Ok(())
   }
}

/// Encodes every emitted value as one line of JSON.
pub struct JsonSink<W: io::Write> {
   name:   String,
   writer: W,
}

impl<W: io::Write> JsonSink<W> {
   #[must_use]
   pub fn new(name: impl Into<String>, writer: W) -> Self {
      Self {
         name: name.into(),
         writer,
      }
   }
}

impl<W: io::Write + Send> PipeSink for JsonSink<W> {
   fn name(&self) -> &str {
      &self.name
   }

   fn emit(&mut self, value: &Value) -> Result<()> {
      serde_json::to_writer(&mut self.writer, value)?;
      self.writer.write_all(b"\n")?;
      self.writer.flush()?;
      Ok(())
   }
}

#[cfg(test)]
mod tests {
   use pretty_assertions::assert_eq;

   use super::*;
   use crate::Error;

   #[test]
   fn json_source_reads_documents() {
      let source = Source::new(JsonSource::new("test", &b"1 \"two\"\n[3]"[..]));

      assert_eq!(source.next().ok().flatten(), Some(Value::from(1)));
      assert_eq!(source.next().ok().flatten(), Some(Value::from("two")));
      assert_eq!(
         source.next().ok().flatten(),
         Some(Value::cons_list([Value::from(3)])),
      );
      assert_eq!(source.next().ok().flatten(), None);
   }

   #[test]
   fn json_sink_writes_lines() {
      let mut buffer = Vec::new();
      let mut sink = JsonSink::new("test", &mut buffer);

      assert!(sink.emit(&Value::from(1)).is_ok());
      assert!(sink.emit(&Value::cons_list([Value::from("a")])).is_ok());
      drop(sink);

      assert_eq!(String::from_utf8_lossy(&buffer), "1\n[\"a\"]\n");
   }

   #[test]
   fn memory_sink_shares_storage() {
      let handle = InMemorySink::new();
      let sink = Sink::new(handle.clone());

      assert!(sink.emit(&Value::from(42)).is_ok());
      assert_eq!(handle.values(), [Value::from(42)]);
   }

   #[test]
   fn emitting_a_sink_into_itself_fails() {
      let (sender, receiver) = std::sync::mpsc::channel();

      std::thread::spawn(move || {
         let sink = Sink::new(JsonSink::new("out", Vec::new()));

         let message = match sink.emit(&Value::cons_list([Value::Sink(sink.dupe())])) {
            Err(Error::Json(error)) => Some(error.to_string()),
            _ => None,
         };

         let _ = sender.send(message);
      });

      let Ok(message) = receiver.recv_timeout(std::time::Duration::from_secs(10)) else {
         panic!("emitting must not block");
      };

      let Some(message) = message else {
         panic!("a sink cannot be encoded");
      };
      assert!(message.contains("<sink: out>"), "{message}");
   }

   #[test]
   fn pipes_format_by_name() {
      let source = Source::new(InMemorySource::new([]));
      let sink = Sink::new(InMemorySink::new());

      assert_eq!(source.to_string(), "<source: memory>");
      assert_eq!(format!("{sink:?}"), "Sink(\"memory\")");
   }
}
