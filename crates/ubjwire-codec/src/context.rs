//! The `Context`: owner of a parsed tree, a construction tree, one cursor
//! stack and an output buffer.
//!
//! The cursor is a stack of [`Frame`]s. Each frame records the slot of its
//! collection inside the parent collection, so the collection is found by
//! walking the slot path from the tree root. Construction edits the tree in
//! place: leaving a frame needs no write-back and every intermediate state is
//! reachable from the root.

use tracing::debug;

use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use crate::parse::Parser;
use crate::render::Renderer;
use crate::value::{Value, ValueType};

/// Which tree a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Produced by parsing; read-only.
    Parsed,
    /// Built through the construction API; append-only.
    Created,
}

/// One level of the cursor stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frame {
    /// Position of this collection in its parent. Unused for the root frame.
    pub(crate) slot: usize,
    /// Read position inside this collection.
    pub(crate) index: usize,
    pub(crate) origin: Origin,
}

impl Frame {
    fn root(origin: Origin) -> Self {
        Self {
            slot: 0,
            index: 0,
            origin,
        }
    }
}

/// Parser, renderer and cursors over one pair of trees.
#[derive(Debug, Default)]
pub struct Context {
    config: CodecConfig,
    root: Option<Value>,
    creation: Option<Value>,
    frames: Vec<Frame>,
    output: Vec<u8>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CodecConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> CodecConfig {
        self.config
    }

    /// Parse `bytes` into the root tree and put the cursor on it.
    ///
    /// The previous root is released first. On failure the context holds no
    /// root; a cursor on the construction tree is left where it was.
    pub fn parse(&mut self, bytes: &[u8]) -> Result<()> {
        self.root = None;
        if self.cursor_origin() == Some(Origin::Parsed) {
            self.frames.clear();
        }

        let root = Parser::new(bytes, self.config).parse_root()?;
        self.root = Some(root);
        self.frames.clear();
        self.frames.push(Frame::root(Origin::Parsed));
        debug!(bytes = bytes.len(), "parsed root");
        Ok(())
    }

    /// The parsed tree, if any.
    pub fn root(&self) -> Option<&Value> {
        self.root.as_ref()
    }

    /// The construction tree, including any still-open collections.
    pub fn creation(&self) -> Option<&Value> {
        self.creation.as_ref()
    }

    /// Release both trees, the cursor and the output buffer.
    pub fn free(&mut self) {
        self.frames.clear();
        self.root = None;
        self.creation = None;
        self.output = Vec::new();
    }

    /// Release the construction tree only.
    pub fn free_creation(&mut self) {
        if self.cursor_origin() == Some(Origin::Created) {
            self.frames.clear();
        }
        self.creation = None;
    }

    /// Append the parsed tree to the output buffer.
    pub fn render(&mut self) -> Result<()> {
        let root = self.root.as_ref().ok_or(CodecError::NoTree)?;
        Renderer::new(&mut self.output, self.config).render(root)
    }

    /// Append the construction tree to the output buffer.
    ///
    /// Open collections are rendered with their current contents; the cursor
    /// does not need to be back at the root.
    pub fn render_creation(&mut self) -> Result<()> {
        let creation = self.creation.as_ref().ok_or(CodecError::NoTree)?;
        Renderer::new(&mut self.output, self.config).render(creation)
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Hand out the rendered bytes, leaving the buffer empty.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    /// Number of open frames; 1 at the root, 0 with no cursor.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Read index of the current frame.
    pub fn index(&self) -> Result<usize> {
        Ok(self.top()?.index)
    }

    /// Element count of the current collection.
    pub fn len(&self) -> Result<usize> {
        let (collection, _) = self.current()?;
        Ok(collection.child_count().unwrap_or(0))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Kind of the current collection (`Array` or `Object`).
    pub fn collection_type(&self) -> Result<ValueType> {
        let (collection, _) = self.current()?;
        Ok(collection.value_type())
    }

    /// Tree the cursor is attached to.
    pub fn cursor_origin(&self) -> Option<Origin> {
        self.frames.first().map(|frame| frame.origin)
    }

    /// Descend into a nested collection.
    ///
    /// On a parsed frame this enters the element at the read index; on a
    /// construction frame it enters the most recently appended element.
    pub fn enter_collection(&mut self) -> Result<()> {
        let (collection, frame) = self.current()?;
        let len = collection.child_count().unwrap_or(0);
        if len == 0 {
            return Err(CodecError::EmptyCollection);
        }
        let slot = match frame.origin {
            Origin::Parsed => frame.index,
            Origin::Created => len - 1,
        };
        let target = child(collection, slot).ok_or(CodecError::EmptyCollection)?;
        if !target.is_collection() {
            return Err(CodecError::NotACollection {
                found: target.value_type(),
            });
        }

        let origin = frame.origin;
        self.frames.try_reserve(1)?;
        self.frames.push(Frame {
            slot,
            index: 0,
            origin,
        });
        Ok(())
    }

    /// Return to the parent frame. Fails on the root frame.
    pub fn exit_collection(&mut self) -> Result<()> {
        match self.frames.len() {
            0 => Err(CodecError::NoTree),
            1 => Err(CodecError::AtRoot),
            _ => {
                self.frames.pop();
                Ok(())
            }
        }
    }

    /// Close every open frame down to the root.
    pub fn exit_to_root(&mut self) {
        self.frames.truncate(1);
    }

    pub(crate) fn top(&self) -> Result<&Frame> {
        self.frames.last().ok_or(CodecError::NoTree)
    }

    pub(crate) fn top_mut(&mut self) -> Result<&mut Frame> {
        self.frames.last_mut().ok_or(CodecError::NoTree)
    }

    /// Current collection and a copy of its frame.
    pub(crate) fn current(&self) -> Result<(&Value, Frame)> {
        let frame = *self.top()?;
        let tree = match frame.origin {
            Origin::Parsed => self.root.as_ref(),
            Origin::Created => self.creation.as_ref(),
        }
        .ok_or(CodecError::NoTree)?;
        let collection = resolve(tree, &self.frames).ok_or(CodecError::NoTree)?;
        Ok((collection, frame))
    }

    /// Current construction collection, mutably. Parsed frames are read-only.
    pub(crate) fn current_created_mut(&mut self) -> Result<&mut Value> {
        let frame = *self.top()?;
        if frame.origin != Origin::Created {
            return Err(CodecError::ReadOnly);
        }
        let tree = self.creation.as_mut().ok_or(CodecError::NoTree)?;
        resolve_mut(tree, &self.frames).ok_or(CodecError::NoTree)
    }

    /// Replace the construction tree with a fresh root and attach the cursor.
    pub(crate) fn start_creation(&mut self, root: Value) {
        self.creation = Some(root);
        self.frames.clear();
        self.frames.push(Frame::root(Origin::Created));
    }
}

fn child(collection: &Value, slot: usize) -> Option<&Value> {
    match collection {
        Value::Array(items) => items.get(slot),
        Value::Object(entries) => entries.get(slot).map(|entry| &entry.value),
        _ => None,
    }
}

fn child_mut(collection: &mut Value, slot: usize) -> Option<&mut Value> {
    match collection {
        Value::Array(items) => items.get_mut(slot),
        Value::Object(entries) => entries.get_mut(slot).map(|entry| &mut entry.value),
        _ => None,
    }
}

fn resolve<'a>(tree: &'a Value, frames: &[Frame]) -> Option<&'a Value> {
    frames
        .iter()
        .skip(1)
        .try_fold(tree, |node, frame| child(node, frame.slot))
}

fn resolve_mut<'a>(tree: &'a mut Value, frames: &[Frame]) -> Option<&'a mut Value> {
    let mut node = tree;
    for frame in frames.iter().skip(1) {
        node = child_mut(node, frame.slot)?;
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failure_leaves_no_root() {
        let mut ctx = Context::new();
        ctx.parse(b"[Z]").unwrap();
        assert!(ctx.root().is_some());

        assert!(ctx.parse(b"[Z").is_err());
        assert!(ctx.root().is_none());
        assert_eq!(ctx.depth(), 0);
        assert_eq!(ctx.render().unwrap_err(), CodecError::NoTree);
    }

    #[test]
    fn parse_failure_keeps_construction_cursor() {
        let mut ctx = Context::new();
        ctx.create_array().unwrap();
        ctx.add_array().unwrap();
        ctx.enter_collection().unwrap();

        assert!(ctx.parse(b"}").is_err());
        assert_eq!(ctx.cursor_origin(), Some(Origin::Created));
        assert_eq!(ctx.depth(), 2);
        ctx.add_int8(1).unwrap();
    }

    #[test]
    fn free_releases_everything() {
        let mut ctx = Context::new();
        ctx.parse(b"{}").unwrap();
        ctx.create_object().unwrap();
        ctx.add_kv_pair_array("a").unwrap();
        ctx.enter_collection().unwrap();
        ctx.render_creation().unwrap();

        ctx.free();
        assert!(ctx.root().is_none());
        assert!(ctx.creation().is_none());
        assert_eq!(ctx.depth(), 0);
        assert!(ctx.output().is_empty());
    }

    #[test]
    fn free_creation_keeps_parsed_cursor() {
        let mut ctx = Context::new();
        ctx.create_object().unwrap();
        ctx.parse(b"[i\x01]").unwrap();
        ctx.free_creation();
        assert!(ctx.creation().is_none());
        assert_eq!(ctx.read_as::<i8>().unwrap(), 1);
    }

    #[test]
    fn render_appends_and_take_empties() {
        let mut ctx = Context::new();
        ctx.parse(b"[]").unwrap();
        ctx.render().unwrap();
        ctx.render().unwrap();
        assert_eq!(ctx.output(), b"[][]");
        assert_eq!(ctx.take_output(), b"[][]".to_vec());
        assert!(ctx.output().is_empty());
    }

    #[test]
    fn exit_on_root_fails() {
        let mut ctx = Context::new();
        assert_eq!(ctx.exit_collection().unwrap_err(), CodecError::NoTree);
        ctx.parse(b"[]").unwrap();
        assert_eq!(ctx.exit_collection().unwrap_err(), CodecError::AtRoot);
    }

    #[test]
    fn enter_scalar_fails() {
        let mut ctx = Context::new();
        ctx.parse(b"[Z]").unwrap();
        assert_eq!(
            ctx.enter_collection().unwrap_err(),
            CodecError::NotACollection {
                found: ValueType::Null
            }
        );
        assert_eq!(ctx.depth(), 1);

        ctx.parse(b"[]").unwrap();
        assert_eq!(ctx.enter_collection().unwrap_err(), CodecError::EmptyCollection);
    }
}
