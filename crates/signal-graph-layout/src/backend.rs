//! The substep contract shared by the CPU and GPU backends.

use crate::layout::Category;
use crate::{Anchor, Link, NodeSpan, Particle, Result, SimParams};

/// Executes integration substeps over a particle set.
///
/// Implementations must evaluate the same force law in the same order so
/// that swapping backends changes only the parallelism, never the result
/// beyond floating-point tolerance. On error the particle slice is left
/// exactly as it was passed in.
pub trait ForceBackend: Send + Sync {
    /// Run `substeps` accumulate/integrate rounds in place.
    fn run_substeps(
        &mut self,
        particles: &mut [Particle],
        field: &ForceField,
        params: &SimParams,
        substeps: u32,
    ) -> Result<()>;

    /// Name of this backend (for logging).
    fn name(&self) -> &'static str;
}

/// Links and category constraints flattened into per-node index lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForceField {
    pub links: Vec<Link>,
    /// Link ids grouped by node; a node's slice is given by its [`NodeSpan`].
    pub link_index: Vec<u32>,
    pub spans: Vec<NodeSpan>,
    pub anchors: Vec<Anchor>,
    /// Category ids grouped by node.
    pub category_index: Vec<u32>,
}

impl ForceField {
    /// Index `links` and `categories` for `node_count` particles.
    ///
    /// Callers validate endpoints and members beforehand; out-of-range ids
    /// are skipped here.
    pub fn build(node_count: usize, links: Vec<Link>, categories: &[Category]) -> Self {
        let mut per_node_links: Vec<Vec<u32>> = vec![Vec::new(); node_count];
        for (i, link) in links.iter().enumerate() {
            for end in [link.par1, link.par2] {
                if let Some(list) = per_node_links.get_mut(end as usize) {
                    list.push(i as u32);
                }
            }
        }

        let mut per_node_categories: Vec<Vec<u32>> = vec![Vec::new(); node_count];
        for (c, category) in categories.iter().enumerate() {
            for member in &category.members {
                if let Some(list) = per_node_categories.get_mut(member.0) {
                    list.push(c as u32);
                }
            }
        }

        let mut field = Self {
            links,
            anchors: categories.iter().map(Category::anchor).collect(),
            ..Self::default()
        };
        for (node_links, node_categories) in per_node_links.iter().zip(&per_node_categories) {
            field.spans.push(NodeSpan {
                link_start: field.link_index.len() as u32,
                link_count: node_links.len() as u32,
                category_start: field.category_index.len() as u32,
                category_count: node_categories.len() as u32,
            });
            field.link_index.extend(node_links);
            field.category_index.extend(node_categories);
        }
        field
    }

    /// Link ids incident to `node`.
    pub fn links_of(&self, node: usize) -> &[u32] {
        match self.spans.get(node) {
            Some(span) => {
                let start = span.link_start as usize;
                &self.link_index[start..start + span.link_count as usize]
            }
            None => &[],
        }
    }

    /// Category ids containing `node`.
    pub fn categories_of(&self, node: usize) -> &[u32] {
        match self.spans.get(node) {
            Some(span) => {
                let start = span.category_start as usize;
                &self.category_index[start..start + span.category_count as usize]
            }
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_graph_core::{NodeId, Vec3};

    fn link(a: u32, b: u32) -> Link {
        Link {
            par1: a,
            par2: b,
            length: 1.0,
            strength: 0.1,
            color: [1.0; 4],
        }
    }

    #[test]
    fn test_field_indexes_both_endpoints() {
        let categories = vec![
            Category::new(vec![NodeId(0), NodeId(2)], Vec3::ZERO, 10.0),
            Category::new(vec![NodeId(2)], Vec3::new(1.0, 0.0, 0.0), 5.0),
        ];
        let field = ForceField::build(3, vec![link(0, 1), link(1, 2), link(2, 2)], &categories);

        assert_eq!(field.links_of(0), &[0]);
        assert_eq!(field.links_of(1), &[0, 1]);
        assert_eq!(field.links_of(2), &[1, 2, 2]);
        assert_eq!(field.categories_of(0), &[0]);
        assert!(field.categories_of(1).is_empty());
        assert_eq!(field.categories_of(2), &[0, 1]);
        assert_eq!(field.anchors[1].radius, 5.0);
        assert!(field.links_of(9).is_empty());
    }
}
