//! Node-producing operators: path starts, location steps, predicates, and the
//! operators that restore document order.

use super::axes::{Axis, AxisIter, NodeTest};
use super::{Context, Query, Shape};
use crate::navigator::{Navigator, NodeKey};
use crate::value::Value;
use itertools::Itertools;
use std::collections::VecDeque;

/// Yields the context node once.
#[derive(Debug, Clone, Default)]
pub struct ContextQuery {
    done: bool,
}

impl ContextQuery {
    pub fn advance<N: Navigator>(&mut self, context: &N) -> Option<N> {
        if self.done {
            return None;
        }
        self.done = true;
        Some(context.clone())
    }

    pub fn reset(&mut self) {
        self.done = false;
    }
}

/// Yields the root of the context node's tree once.
#[derive(Debug, Clone, Default)]
pub struct RootQuery {
    done: bool,
}

impl RootQuery {
    pub fn advance<N: Navigator>(&mut self, context: &N) -> Option<N> {
        if self.done {
            return None;
        }
        self.done = true;
        let mut root = context.clone();
        root.move_to_root();
        Some(root)
    }

    pub fn reset(&mut self) {
        self.done = false;
    }
}

/// What a step over `input` along `axis` produces, or `None` when its output
/// may be out of document order or contain duplicates.
pub fn step_shape(input: Shape, axis: Axis) -> Option<Shape> {
    let flat = input.single || (input.peers && input.ordered);
    match axis {
        Axis::SelfAxis => Some(input),
        Axis::Child | Axis::Attribute => flat.then_some(Shape::PEERS),
        Axis::Descendant | Axis::DescendantOrSelf => flat.then_some(Shape::ORDERED),
        Axis::Parent => input.single.then_some(Shape::SINGLE),
        Axis::FollowingSibling => input.single.then_some(Shape::PEERS),
        Axis::Following => input.single.then_some(Shape::ORDERED),
        Axis::PrecedingSibling => input.single.then_some(Shape::REVERSE_PEERS),
        Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding => {
            input.single.then_some(Shape::UNORDERED)
        }
    }
}

/// A location step: walks `axis` from every node of `input` and keeps the
/// nodes passing `test`.
#[derive(Debug, Clone)]
pub struct StepQuery<N> {
    input: Box<Query<N>>,
    axis: Axis,
    test: NodeTest,
    shape: Shape,
    walk: Option<AxisIter<N>>,
    group: usize,
}

impl<N: Navigator> StepQuery<N> {
    pub fn new(input: Query<N>, axis: Axis, test: NodeTest) -> Self {
        let shape = step_shape(input.shape(), axis).unwrap_or(Shape::UNORDERED);
        StepQuery {
            input: Box::new(input),
            axis,
            test,
            shape,
            walk: None,
            group: 0,
        }
    }

    pub fn advance(&mut self, context: &N) -> Option<N> {
        loop {
            if let Some(walk) = self.walk.as_mut() {
                for node in walk {
                    if self.test.matches(&node, self.axis) {
                        return Some(node);
                    }
                }
                self.walk = None;
            }
            let from = self.input.advance(context)?;
            self.group += 1;
            self.walk = Some(AxisIter::new(self.axis, from));
        }
    }

    pub fn reset(&mut self) {
        self.input.reset();
        self.walk = None;
        self.group = 0;
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn group(&self) -> usize {
        self.group
    }
}

/// A predicate applied to a node stream.
///
/// Positions count from 1 within each group of the input, so `a/b[1]` is the
/// first `b` of every `a`. Over a primary expression the whole input is one
/// group. When the predicate needs `last()` the group is buffered to learn its
/// size; otherwise nodes are tested as they arrive.
#[derive(Debug, Clone)]
pub struct FilterQuery<N> {
    input: Box<Query<N>>,
    predicate: Box<Query<N>>,
    per_context: bool,
    needs_size: bool,
    current: Option<usize>,
    position: usize,
    emitted: usize,
    buffer: VecDeque<(usize, N)>,
    pending: Option<(usize, N)>,
}

impl<N: Navigator> FilterQuery<N> {
    pub fn new(input: Query<N>, predicate: Query<N>, per_context: bool, needs_size: bool) -> Self {
        FilterQuery {
            input: Box::new(input),
            predicate: Box::new(predicate),
            per_context,
            needs_size,
            current: None,
            position: 0,
            emitted: 0,
            buffer: VecDeque::new(),
            pending: None,
        }
    }

    fn input_group(&self) -> usize {
        if self.per_context { self.input.group() } else { 0 }
    }

    fn keep(&self, node: &N, position: usize, size: usize) -> bool {
        let ctx = Context {
            node,
            position,
            size,
        };
        match self.predicate.evaluate(&ctx) {
            // Fractional positions truncate.
            Value::Number(n) => n >= 1.0 && n as usize == position,
            other => other.to_bool(),
        }
    }

    pub fn advance(&mut self, context: &N) -> Option<N> {
        if self.needs_size {
            return self.advance_buffered(context);
        }
        loop {
            let node = self.input.advance(context)?;
            let group = self.input_group();
            if self.current != Some(group) {
                self.current = Some(group);
                self.position = 0;
            }
            self.position += 1;
            if self.keep(&node, self.position, self.position) {
                self.emitted = group;
                return Some(node);
            }
        }
    }

    fn advance_buffered(&mut self, context: &N) -> Option<N> {
        loop {
            if let Some((group, node)) = self.buffer.pop_front() {
                self.emitted = group;
                return Some(node);
            }
            let (group, first) = match self.pending.take() {
                Some(pending) => pending,
                None => {
                    let node = self.input.advance(context)?;
                    (self.input_group(), node)
                }
            };
            let mut members = vec![first];
            while let Some(node) = self.input.advance(context) {
                let next_group = self.input_group();
                if next_group != group {
                    self.pending = Some((next_group, node));
                    break;
                }
                members.push(node);
            }
            let size = members.len();
            for (i, node) in members.into_iter().enumerate() {
                if self.keep(&node, i + 1, size) {
                    self.buffer.push_back((group, node));
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.input.reset();
        self.predicate.reset();
        self.current = None;
        self.position = 0;
        self.emitted = 0;
        self.buffer.clear();
        self.pending = None;
    }

    pub fn shape(&self) -> Shape {
        self.input.shape()
    }

    pub fn group(&self) -> usize {
        self.emitted
    }
}

/// Drains the inputs, then yields their nodes in document order with
/// duplicates removed.
fn sort_unique<N: Navigator>(nodes: Vec<N>) -> VecDeque<N> {
    let total = nodes.len();
    let sorted: VecDeque<N> = nodes
        .into_iter()
        .map(|n| (NodeKey::of(&n), n))
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .dedup_by(|a, b| a.0 == b.0)
        .map(|(_, n)| n)
        .collect();
    log::trace!("Merged {} nodes into {} in document order", total, sorted.len());
    sorted
}

/// Restores document order and uniqueness on a stream that may lack them.
#[derive(Debug, Clone)]
pub struct MergeQuery<N> {
    input: Box<Query<N>>,
    sorted: Option<VecDeque<N>>,
}

impl<N: Navigator> MergeQuery<N> {
    pub fn new(input: Query<N>) -> Self {
        MergeQuery {
            input: Box::new(input),
            sorted: None,
        }
    }

    pub fn advance(&mut self, context: &N) -> Option<N> {
        let input = &mut self.input;
        self.sorted
            .get_or_insert_with(|| sort_unique(std::iter::from_fn(|| input.advance(context)).collect()))
            .pop_front()
    }

    pub fn reset(&mut self) {
        self.input.reset();
        self.sorted = None;
    }
}

/// `left | right`: the nodes of both operands in document order.
#[derive(Debug, Clone)]
pub struct UnionQuery<N> {
    left: Box<Query<N>>,
    right: Box<Query<N>>,
    sorted: Option<VecDeque<N>>,
}

impl<N: Navigator> UnionQuery<N> {
    pub fn new(left: Query<N>, right: Query<N>) -> Self {
        UnionQuery {
            left: Box::new(left),
            right: Box::new(right),
            sorted: None,
        }
    }

    pub fn advance(&mut self, context: &N) -> Option<N> {
        if self.sorted.is_none() {
            let mut nodes: Vec<N> = std::iter::from_fn(|| self.left.advance(context)).collect();
            nodes.extend(std::iter::from_fn(|| self.right.advance(context)));
            self.sorted = Some(sort_unique(nodes));
        }
        self.sorted.as_mut().and_then(VecDeque::pop_front)
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.sorted = None;
    }
}
