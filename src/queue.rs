// Copyright 2019-2020 Adam Greig
// Dual licensed under the Apache 2.0 and MIT licenses.

//! L1: the command queue.
//!
//! The source library represents the queue as an intrusive doubly-linked
//! list of `swd_cmd_t` nodes connected by raw `prev`/`next` pointers. This
//! rewrite keeps an arena (`Vec<Element>`) addressed by index instead: it is
//! stable under growth, every retry can cheaply re-walk a range by index,
//! and there is no prev/next invariant to keep consistent by hand (see
//! the module layering.

use crate::error::{Error, Result};

/// A queue position. `0` is the root (first-appended) element.
pub type ElementId = usize;

/// Which way the bus is driven for a given element kind. `Undefined` is
/// never transmitted and exists only as the queue's initial "no direction
/// latched yet" sentinel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Mosi,
    Miso,
    Undefined,
}

/// Tagged kind of a single queued bus phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    MosiRequest,
    MosiTrn,
    MosiData,
    MosiParity,
    MosiBitBang,
    MosiControl,
    MisoTrn,
    MisoAck,
    MisoData,
    MisoParity,
    MisoBitBang,
}

impl Kind {
    /// Direction implied by this kind.
    pub fn direction(self) -> Direction {
        match self {
            Kind::MosiRequest
            | Kind::MosiTrn
            | Kind::MosiData
            | Kind::MosiParity
            | Kind::MosiBitBang
            | Kind::MosiControl => Direction::Mosi,
            Kind::MisoTrn | Kind::MisoAck | Kind::MisoData | Kind::MisoParity | Kind::MisoBitBang => {
                Direction::Miso
            }
        }
    }
}

/// Payload carried by a queue element. MISO payloads start `Pending` and
/// are filled in by flush.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// A value already known at enqueue time (MOSI data, a request byte, a
    /// control run byte).
    Value(u32),
    /// A MISO slot awaiting the driver's response.
    Pending,
    /// A MISO slot that has been filled in by flush.
    Filled(u32),
}

impl Payload {
    /// The value carried, if any has been established yet.
    pub fn value(&self) -> Option<u32> {
        match self {
            Payload::Value(v) | Payload::Filled(v) => Some(*v),
            Payload::Pending => None,
        }
    }
}

/// A single queued bus phase.
#[derive(Clone, Debug)]
pub struct Element {
    pub kind: Kind,
    /// Number of clock edges this element consumes.
    pub bits: u8,
    pub payload: Payload,
    pub done: bool,
}

impl Element {
    fn new(kind: Kind, bits: u8, payload: Payload) -> Self {
        Element { kind, bits, payload, done: false }
    }
}

/// Which slice of the queue a flush pass should cover.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlushRange {
    All,
    /// root..=current
    Head(ElementId),
    /// current..=tail
    Tail(ElementId),
    One(ElementId),
    Last,
}

/// The command queue itself: an ordered, append-only (until freed) arena of
/// [`Element`]s.
#[derive(Default)]
pub struct Queue {
    elements: Vec<Element>,
}

impl Queue {
    pub fn new() -> Self {
        Queue { elements: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn root(&self) -> Option<ElementId> {
        if self.elements.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    pub fn tail(&self) -> Option<ElementId> {
        self.elements.len().checked_sub(1)
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id)
    }

    /// Direction of the last appended element, or `Undefined` if the queue
    /// is empty (nothing has latched a direction yet).
    pub fn tail_direction(&self) -> Direction {
        self.elements.last().map(|e| e.kind.direction()).unwrap_or(Direction::Undefined)
    }

    /// Append one element to the tail. Returns its id.
    fn push(&mut self, kind: Kind, bits: u8, payload: Payload) -> ElementId {
        self.elements.push(Element::new(kind, bits, payload));
        self.elements.len() - 1
    }

    pub fn append_value(&mut self, kind: Kind, bits: u8, value: u32) -> ElementId {
        self.push(kind, bits, Payload::Value(value))
    }

    pub fn append_pending(&mut self, kind: Kind, bits: u8) -> ElementId {
        self.push(kind, bits, Payload::Pending)
    }

    /// Release every element. Fails unless every element is `done`, unless
    /// `force` is set (never silently drop unflushed state).
    pub fn free_all(&mut self, force: bool) -> Result<()> {
        if !force && self.elements.iter().any(|e| !e.done) {
            return Err(Error::QueueNotFree);
        }
        self.elements.clear();
        Ok(())
    }

    /// Release elements `[0, upto]` inclusive (the "head" of the queue).
    pub fn free_head(&mut self, upto: ElementId, force: bool) -> Result<()> {
        if upto >= self.elements.len() {
            return Err(Error::Range { field: "upto", value: upto as u32 });
        }
        if !force && self.elements[..=upto].iter().any(|e| !e.done) {
            return Err(Error::QueueNotFree);
        }
        self.elements.drain(..=upto);
        Ok(())
    }

    /// Release elements `[from, end]` inclusive (the "tail" of the queue).
    pub fn free_tail(&mut self, from: ElementId, force: bool) -> Result<()> {
        if from >= self.elements.len() {
            return Err(Error::Range { field: "from", value: from as u32 });
        }
        if !force && self.elements[from..].iter().any(|e| !e.done) {
            return Err(Error::QueueNotFree);
        }
        self.elements.truncate(from);
        Ok(())
    }

    /// Resolve a [`FlushRange`] into a concrete `(start, end)` inclusive
    /// index range, or `None` for an empty queue.
    pub fn resolve_range(&self, range: FlushRange) -> Option<(ElementId, ElementId)> {
        let tail = self.tail()?;
        match range {
            FlushRange::All => Some((0, tail)),
            FlushRange::Head(current) => Some((0, current.min(tail))),
            FlushRange::Tail(current) => Some((current.min(tail), tail)),
            FlushRange::One(id) => Some((id.min(tail), id.min(tail))),
            FlushRange::Last => Some((tail, tail)),
        }
    }
}
