//! Relationship graph between entities and the per-row association lists.
//!
//! Everything here is a pure transformation over in-memory data; persisting
//! links lives in `storage::repository::RowRepository`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::schema::{Entity, EntityRelationship};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedRowRef {
    pub row_id: i32,
    pub order: i32,
}

/// relationship id -> 已关联的行
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedRows {
    by_relationship: BTreeMap<i32, Vec<RelatedRowRef>>,
}

impl RelatedRows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, relationship_id: i32) -> &[RelatedRowRef] {
        self.by_relationship
            .get(&relationship_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn count(&self, relationship_id: i32) -> usize {
        self.get(relationship_id).len()
    }

    pub fn relationship_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.by_relationship.keys().copied()
    }

    /// distinct 关系：新选择覆盖旧值（最多一行）；
    /// 非 distinct：追加并按 row id 去重
    pub fn add_related_rows(&mut self, relationship: &EntityRelationship, row_ids: &[i32]) {
        let entry = self.by_relationship.entry(relationship.id).or_default();
        if relationship.distinct {
            entry.clear();
            if let Some(first) = row_ids.first() {
                entry.push(RelatedRowRef {
                    row_id: *first,
                    order: 0,
                });
            }
            return;
        }

        for row_id in row_ids {
            if entry.iter().any(|r| r.row_id == *row_id) {
                continue;
            }
            let order = entry.iter().map(|r| r.order + 1).max().unwrap_or(0);
            entry.push(RelatedRowRef {
                row_id: *row_id,
                order,
            });
        }
    }

    pub fn remove_related_row(&mut self, relationship_id: i32, row_id: i32) -> bool {
        let Some(entry) = self.by_relationship.get_mut(&relationship_id) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|r| r.row_id != row_id);
        before != entry.len()
    }

    pub(crate) fn insert(&mut self, relationship_id: i32, row: RelatedRowRef) {
        let entry = self.by_relationship.entry(relationship_id).or_default();
        entry.push(row);
        entry.sort_by_key(|r| r.order);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelationshipVisibility<'a> {
    pub visible: Vec<&'a EntityRelationship>,
    pub hidden: Vec<&'a EntityRelationship>,
}

/// 只有"没有关联行且标记了 hiddenIfEmpty"的关系被隐藏
pub fn visible_relationships<'a>(
    entity: &'a Entity,
    related: &RelatedRows,
) -> RelationshipVisibility<'a> {
    let mut out = RelationshipVisibility::default();
    for rel in entity.relationships() {
        if rel.hidden_if_empty && related.count(rel.id) == 0 {
            out.hidden.push(rel);
        } else {
            out.visible.push(rel);
        }
    }
    out
}

/// 从 `start` 出发沿 parent -> child 方向可达的实体（不含自身，除非存在环）
pub fn descendant_entities(start: i32, relationships: &[EntityRelationship]) -> BTreeSet<i32> {
    walk(start, relationships, |r| (r.parent_id, r.child_id))
}

pub fn ancestor_entities(start: i32, relationships: &[EntityRelationship]) -> BTreeSet<i32> {
    walk(start, relationships, |r| (r.child_id, r.parent_id))
}

// 关系图允许有环，必须记录 visited
fn walk(
    start: i32,
    relationships: &[EntityRelationship],
    edge: impl Fn(&EntityRelationship) -> (i32, i32),
) -> BTreeSet<i32> {
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for rel in relationships {
            let (from, to) = edge(rel);
            if from == current && visited.insert(to) {
                queue.push_back(to);
            }
        }
    }
    visited
}
