//! Turns source text into forms.
//!
//! Comments directly above a form, or on the same line after it, are kept as
//! an annotation on the form. A blank line between a comment and a form
//! detaches the comment.

use std::{
   collections::VecDeque,
   io::{
      self,
      BufRead as _,
   },
   sync::Arc,
};

use arcstr::ArcStr;
use kiln_syntax::{
   Error,
   Kind,
   Position,
   Reason,
   Result,
   Segment,
   Token,
   Tokenizer,
   Word,
   word,
};

use crate::{
   Annotate,
   Bind,
   CommandPath,
   DirPath,
   ExtendPath,
   FileOrDirPath,
   FilePath,
   Keyword,
   Symbol,
   Value,
};

/// Lazily decodes UTF-8 characters from a reader, one line at a time.
pub struct Chars<R: io::BufRead> {
   reader:  R,
   pending: VecDeque<char>,
   failed:  bool,
}

impl<R: io::BufRead> Chars<R> {
   pub fn new(reader: R) -> Self {
      Self {
         reader,
         pending: VecDeque::new(),
         failed: false,
      }
   }
}

impl<R: io::BufRead> Iterator for Chars<R> {
   type Item = io::Result<char>;

   fn next(&mut self) -> Option<Self::Item> {
      if self.failed {
         return None;
      }

      if self.pending.is_empty() {
         let mut line = String::new();

         match self.reader.read_line(&mut line) {
            Ok(0) => return None,
            Ok(_) => self.pending.extend(line.chars()),
            Err(error) => {
               self.failed = true;
               return Some(Err(error));
            },
         }
      }

      self.pending.pop_front().map(Ok)
   }
}

#[derive(Default)]
struct Comment {
   text:      String,
   paragraph: bool,
}

impl Comment {
   fn push(&mut self, line: &str) {
      if line.is_empty() {
         self.paragraph = !self.text.is_empty();
         return;
      }

      if !self.text.is_empty() {
         self.text.push_str(if self.paragraph { "\n\n" } else { " " });
      }

      self.paragraph = false;
      self.text.push_str(line);
   }

   fn finish(self) -> Option<String> {
      (!self.text.is_empty()).then_some(self.text)
   }
}

fn closing(kind: Kind) -> Option<char> {
   match kind {
      Kind::TOKEN_RIGHT_PARENTHESIS => Some(')'),
      Kind::TOKEN_RIGHT_BRACKET => Some(']'),
      Kind::TOKEN_RIGHT_CURLYBRACE => Some('}'),
      _ => None,
   }
}

fn segment(segment: Segment) -> FileOrDirPath {
   match segment {
      Segment::File(name) => FileOrDirPath::File(FilePath::new(&name)),
      Segment::Directory(name) => FileOrDirPath::Dir(DirPath::new(&name)),
   }
}

fn word_value(word: Word) -> Value {
   match word {
      Word::Ignore => Value::Ignore,
      Word::Null => Value::Null,
      Word::Boolean(boolean) => Value::Bool(boolean),
      Word::Integer(integer) => Value::Int(Arc::new(integer)),

      Word::Symbol(name) => Value::Symbol(Symbol::new(&name)),
      Word::Keyword(name) => Value::Keyword(Keyword::new(&name)),

      Word::Command(name) => Value::CommandPath(CommandPath::new(&name)),
      Word::Directory(path) => Value::DirPath(DirPath::new(&path)),

      // `base:key` reads as the call `(:key base)`.
      Word::Access { base, key } => {
         Value::pair_list([Value::Keyword(Keyword::new(&key)), word_value(*base)])
      },

      Word::Extend { parent, child } => {
         Value::ExtendPath(ExtendPath::new(word_value(*parent), segment(child)))
      },
   }
}

/// Normalizes the form written after `^` into a bind.
fn metadata(form: Value, position: Position) -> Result<Bind> {
   match form {
      Value::Bind(bind) => Ok(bind),
      Value::Keyword(keyword) => Ok(Bind::from_iter([Value::Keyword(keyword), Value::Bool(true)])),

      Value::Empty | Value::Pair(_) | Value::Cons(_) => {
         Err(Error::syntax(
            position,
            Reason::MalformedMetadata(form.to_string()),
         ))
      },

      other => Ok(Bind::from_iter([Value::keyword("tag"), other])),
   }
}

fn is_rest_marker(value: &Value) -> bool {
   matches!(*value, Value::Symbol(ref symbol) if symbol.name() == "&")
}

/// Reads forms one at a time from a character stream.
///
/// Each read is independent. After an error, the next read resumes at the
/// token following the one that failed.
pub struct Reader<I: Iterator<Item = io::Result<char>>> {
   tokens: Tokenizer<I>,
   peeked: Option<Token>,
}

impl<R: io::Read> Reader<Chars<io::BufReader<R>>> {
   pub fn new(read: R) -> Self {
      Self::from_chars(Chars::new(io::BufReader::new(read)))
   }
}

impl<I: Iterator<Item = io::Result<char>>> Reader<I> {
   pub fn from_chars(chars: I) -> Self {
      Self {
         tokens: Tokenizer::new(chars),
         peeked: None,
      }
   }

   fn peek(&mut self) -> Result<Option<&Token>> {
      if self.peeked.is_none() {
         self.peeked = self.tokens.next().transpose()?;
      }

      Ok(self.peeked.as_ref())
   }

   fn peek_kind(&mut self) -> Result<Option<Kind>> {
      Ok(self.peek()?.map(|token| token.kind))
   }

   fn bump(&mut self) -> Result<Option<Token>> {
      match self.peeked.take() {
         Some(token) => Ok(Some(token)),
         None => self.tokens.next().transpose(),
      }
   }

   /// Skips trivia, collecting the comment that documents the next form.
   fn leading_comment(&mut self) -> Result<Option<String>> {
      let mut comment = Comment::default();

      while let Some(token) = self.peek()? {
         match token.kind {
            Kind::TOKEN_SPACE if token.line_breaks() > 1 => comment = Comment::default(),
            Kind::TOKEN_COMMENT => comment.push(token.comment_text()),
            Kind::TOKEN_SPACE | Kind::TOKEN_SHEBANG => {},
            _ => break,
         }

         self.bump()?;
      }

      Ok(comment.finish())
   }

   /// Consumes a comment on the same line as the form just read.
   fn trailing_comment(&mut self) -> Result<Option<String>> {
      if let Some(token) = self.peek()?
         && token.kind == Kind::TOKEN_SPACE
         && token.line_breaks() == 0
      {
         self.bump()?;
      }

      match self.peek()? {
         Some(token) if token.kind == Kind::TOKEN_COMMENT => {
            let comment = token.comment_text().to_owned();
            self.bump()?;
            Ok((!comment.is_empty()).then_some(comment))
         },

         _ => Ok(None),
      }
   }

   fn skip_trivia(&mut self) -> Result<()> {
      while let Some(kind) = self.peek_kind()? {
         if !kind.is_trivia() {
            break;
         }

         self.bump()?;
      }

      Ok(())
   }

   /// Reads the next form with its comments and metadata. Returns `None` at
   /// the end of input and in front of a closing delimiter, which is left
   /// unconsumed.
   fn form(&mut self) -> Result<Option<Value>> {
      let leading = self.leading_comment()?;

      let mut meta: Option<Bind> = None;
      while self.peek_kind()? == Some(Kind::TOKEN_CARET) {
         let Some(caret) = self.bump()? else {
            break;
         };

         self.skip_trivia()?;
         let Some(form) = self.plain()? else {
            return Err(Error::syntax(caret.position, Reason::MissingMetadataTarget));
         };

         let normalized = metadata(form, caret.position)?;
         meta = Some(match meta {
            Some(outer) => outer.concat(&normalized),
            None => normalized,
         });

         self.skip_trivia()?;
         if self.peek_kind()?.is_none_or(|kind| closing(kind).is_some()) {
            return Err(Error::syntax(caret.position, Reason::MissingMetadataTarget));
         }
      }

      let Some(value) = self.plain()? else {
         return Ok(None);
      };

      let trailing = self.trailing_comment()?;

      let comment = match (leading, trailing) {
         (Some(leading), Some(trailing)) => Some(format!("{leading} {trailing}")),
         (leading, trailing) => leading.or(trailing),
      };

      if comment.is_none() && meta.is_none() {
         return Ok(Some(value));
      }

      Ok(Some(Value::Annotate(Annotate::new(
         value,
         comment.map(ArcStr::from),
         meta,
      ))))
   }

   /// Reads a form without looking for comments or metadata around it.
   fn plain(&mut self) -> Result<Option<Value>> {
      let Some(kind) = self.peek_kind()? else {
         return Ok(None);
      };

      if closing(kind).is_some() {
         return Ok(None);
      }

      if kind == Kind::TOKEN_CARET || kind.is_trivia() {
         return self.form();
      }

      let Some(token) = self.bump()? else {
         return Ok(None);
      };

      Ok(Some(match token.kind {
         Kind::TOKEN_WORD => word_value(word::parse(&token.text, token.position)?),
         Kind::TOKEN_STRING => {
            Value::from(kiln_syntax::unescape_string(&token.text, token.position)?.as_str())
         },

         Kind::TOKEN_LEFT_PARENTHESIS => {
            let (items, tail) = self.elements(&token, Kind::TOKEN_RIGHT_PARENTHESIS, true)?;

            items
               .into_iter()
               .rev()
               .fold(tail.unwrap_or(Value::Empty), |d, a| Value::pair(a, d))
         },

         Kind::TOKEN_LEFT_BRACKET => {
            let (items, tail) = self.elements(&token, Kind::TOKEN_RIGHT_BRACKET, true)?;

            items
               .into_iter()
               .rev()
               .fold(tail.unwrap_or(Value::Empty), |d, a| Value::cons(a, d))
         },

         Kind::TOKEN_LEFT_CURLYBRACE => {
            let (items, _) = self.elements(&token, Kind::TOKEN_RIGHT_CURLYBRACE, false)?;

            Value::Bind(Bind::from_iter(items))
         },

         _ => unreachable!("trivia, carets and closing delimiters are handled above"),
      }))
   }

   /// Reads the elements of a list up to and including `close`. With
   /// `allow_rest`, `& form` right before the closing delimiter becomes the
   /// tail.
   fn elements(
      &mut self,
      open: &Token,
      close: Kind,
      allow_rest: bool,
   ) -> Result<(Vec<Value>, Option<Value>)> {
      let open_char = open.text.chars().next().unwrap_or('(');

      let mut items = Vec::new();
      let mut tail = None;

      loop {
         let position = self.peek()?.map(|token| token.position);

         if let Some(value) = self.form()? {
            if tail.is_some() || (allow_rest && is_rest_marker(&value) && items.is_empty()) {
               return Err(Error::syntax(
                  position.unwrap_or(open.position),
                  Reason::MisplacedRest,
               ));
            }

            if allow_rest && is_rest_marker(&value) {
               let Some(rest) = self.form()? else {
                  return Err(Error::syntax(
                     position.unwrap_or(open.position),
                     Reason::MisplacedRest,
                  ));
               };

               tail = Some(rest);
               continue;
            }

            items.push(value);
            continue;
         }

         let Some(token) = self.bump()? else {
            return Err(Error::syntax(
               open.position,
               Reason::UnterminatedList(open_char),
            ));
         };

         if token.kind == close {
            return Ok((items, tail));
         }

         let unexpected = closing(token.kind).unwrap_or('?');
         return Err(Error::syntax(
            token.position,
            Reason::UnexpectedDelimiter(unexpected),
         ));
      }
   }

   /// Reads the next top-level form, `None` at the end of input.
   pub fn next_form(&mut self) -> Result<Option<Value>> {
      if let Some(value) = self.form()? {
         return Ok(Some(value));
      }

      match self.bump()? {
         None => Ok(None),
         Some(token) => {
            Err(Error::syntax(
               token.position,
               Reason::UnexpectedDelimiter(closing(token.kind).unwrap_or('?')),
            ))
         },
      }
   }
}

impl<I: Iterator<Item = io::Result<char>>> Iterator for Reader<I> {
   type Item = Result<Value>;

   fn next(&mut self) -> Option<Self::Item> {
      self.next_form().transpose()
   }
}

/// Reads every form of an in-memory source.
pub fn read_all(source: &str) -> Result<Vec<Value>> {
   Reader::new(source.as_bytes()).collect()
}
