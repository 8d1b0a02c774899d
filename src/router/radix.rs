//! Segment tree for route matching.
//!
//! Each node is one path segment. Static children are tried before the
//! variable child, and the search backtracks, so `/items/recent` wins over
//! `/items/{id}` while `/items/recent/history` can still fall through to a
//! variable route if no static route continues. Variable names are not stored
//! in the tree: two patterns that differ only in variable names share nodes,
//! and the values are collected positionally and zipped with the matched
//! entry's names.
//!
//! Lookup cost grows with the number of segments in the path, not with the
//! number of routes.

use super::core::RouteEntry;
use crate::spec::Segment;
use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;

pub(crate) type Captures<'p> = SmallVec<[&'p str; 8]>;

#[derive(Debug, Default)]
pub(crate) struct RadixNode {
    segment: String,
    /// Routes terminating here, in registration order
    routes: Vec<(Method, Arc<RouteEntry>)>,
    children: Vec<RadixNode>,
    param_child: Option<Box<RadixNode>>,
}

impl RadixNode {
    fn with_segment(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            ..Self::default()
        }
    }

    /// Insert `entry`; on a structural duplicate the already registered entry
    /// is returned and the tree is left untouched.
    pub(crate) fn insert(
        &mut self,
        segments: &[Segment],
        entry: Arc<RouteEntry>,
    ) -> Result<(), Arc<RouteEntry>> {
        let Some((first, rest)) = segments.split_first() else {
            if let Some((_, existing)) = self.routes.iter().find(|(m, _)| *m == entry.method) {
                return Err(Arc::clone(existing));
            }
            self.routes.push((entry.method.clone(), entry));
            return Ok(());
        };

        match first {
            Segment::Variable(_) => self
                .param_child
                .get_or_insert_with(|| Box::new(RadixNode::default()))
                .insert(rest, entry),
            Segment::Static(literal) => {
                if let Some(child) = self.children.iter_mut().find(|c| c.segment == *literal) {
                    return child.insert(rest, entry);
                }
                let mut child = RadixNode::with_segment(literal);
                let out = child.insert(rest, entry);
                self.children.push(child);
                out
            }
        }
    }

    pub(crate) fn search<'p>(
        &self,
        segments: &[&'p str],
        method: &Method,
        captures: &mut Captures<'p>,
    ) -> Option<&Arc<RouteEntry>> {
        let Some((first, rest)) = segments.split_first() else {
            return self
                .routes
                .iter()
                .find(|(m, _)| m == method)
                .map(|(_, entry)| entry);
        };

        for child in &self.children {
            if child.segment == *first {
                if let Some(found) = child.search(rest, method, captures) {
                    return Some(found);
                }
            }
        }

        if let Some(param) = &self.param_child {
            captures.push(*first);
            if let Some(found) = param.search(rest, method, captures) {
                return Some(found);
            }
            captures.pop();
        }

        None
    }

    /// Every method that has a route matching `segments`.
    pub(crate) fn collect_methods(&self, segments: &[&str], out: &mut Vec<Method>) {
        let Some((first, rest)) = segments.split_first() else {
            for (method, _) in &self.routes {
                if !out.contains(method) {
                    out.push(method.clone());
                }
            }
            return;
        };
        for child in &self.children {
            if child.segment == *first {
                child.collect_methods(rest, out);
            }
        }
        if let Some(param) = &self.param_child {
            param.collect_methods(rest, out);
        }
    }
}
