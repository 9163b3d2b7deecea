use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::{mean, median, sorted};
use crate::error::{Error, Result};
use crate::record::{Dataset, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Statistic the ranking is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Median,
    Mean,
    Count,
}

#[derive(Debug, Clone)]
pub struct RankQuery {
    pub group_field: String,
    pub target_field: String,
    pub min_entries: usize,
    pub top_n: usize,
    pub order: SortOrder,
    pub by: SortKey,
}

impl RankQuery {
    pub fn new(group_field: &str, target_field: &str) -> Self {
        RankQuery {
            group_field: group_field.to_string(),
            target_field: target_field.to_string(),
            min_entries: 1,
            top_n: usize::MAX,
            order: SortOrder::default(),
            by: SortKey::default(),
        }
    }

    pub fn min_entries(mut self, m: usize) -> Self {
        self.min_entries = m;
        self
    }

    pub fn top(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn by(mut self, by: SortKey) -> Self {
        self.by = by;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStatistics {
    pub key: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
}

impl GroupStatistics {
    fn value(&self, by: SortKey) -> f64 {
        match by {
            SortKey::Median => self.median,
            SortKey::Mean => self.mean,
            SortKey::Count => self.count as f64,
        }
    }
}

/// Surviving groups in rank order, plus the records of the selected top groups.
#[derive(Debug, Clone)]
pub struct Ranking {
    groups: Vec<GroupStatistics>,
    selected: usize,
    records: Dataset,
}

impl Ranking {
    /// The first `top_n` groups.
    pub fn top(&self) -> &[GroupStatistics] {
        &self.groups[..self.selected]
    }

    /// Every group that passed the size filter, ranked.
    pub fn all(&self) -> &[GroupStatistics] {
        &self.groups
    }

    /// Records of the top groups, laid out group by group in rank order.
    pub fn records(&self) -> &Dataset {
        &self.records
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.top().iter().map(|g| g.key.as_str())
    }
}

/// Filtering can legitimately leave nothing to rank.
#[derive(Debug, Clone)]
pub enum RankOutcome {
    Ranked(Ranking),
    Empty,
}

impl RankOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, RankOutcome::Empty)
    }

    pub fn ranked(self) -> Option<Ranking> {
        match self {
            RankOutcome::Ranked(r) => Some(r),
            RankOutcome::Empty => None,
        }
    }
}

struct Group<'a> {
    key: String,
    members: Vec<(usize, &'a Record)>,
}

/// Partition by the display form of `field`, groups in first-seen order.
fn partition<'a>(dataset: &'a Dataset, field: &str) -> Result<Vec<Group<'a>>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group<'a>> = Vec::new();
    for (i, rec) in dataset.iter().enumerate() {
        let key = rec
            .get(field)
            .ok_or_else(|| Error::MissingField {
                record: i,
                field: field.to_string(),
            })?
            .to_string();
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(Group {
                key,
                members: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].members.push((i, rec));
    }
    Ok(groups)
}

fn summarize(group: &Group<'_>, target: &str) -> Result<GroupStatistics> {
    let values = group
        .members
        .iter()
        .map(|(i, r)| r.require_f64(*i, target))
        .collect::<Result<Vec<_>>>()?;
    let values = sorted(values);
    Ok(GroupStatistics {
        key: group.key.clone(),
        count: values.len(),
        mean: mean(&values),
        median: median(&values),
    })
}

/// Filter groups smaller than `min_entries`, summarize the rest, rank them
/// and keep the top `top_n`. Ties keep first-seen group order.
pub fn rank_groups(dataset: &Dataset, query: &RankQuery) -> Result<RankOutcome> {
    let groups: Vec<Group<'_>> = partition(dataset, &query.group_field)?
        .into_iter()
        .filter(|g| g.members.len() >= query.min_entries)
        .collect();

    if groups.is_empty() {
        debug!(min_entries = query.min_entries, "no group survived the size filter");
        return Ok(RankOutcome::Empty);
    }

    let mut ranked: Vec<(GroupStatistics, &Group<'_>)> = groups
        .iter()
        .map(|g| Ok((summarize(g, &query.target_field)?, g)))
        .collect::<Result<_>>()?;

    // sort_by is stable, so equal statistics stay in discovery order
    ranked.sort_by(|(a, _), (b, _)| {
        let ord = a.value(query.by).total_cmp(&b.value(query.by));
        match query.order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    });

    let selected = query.top_n.min(ranked.len());
    let records: Dataset = ranked[..selected]
        .iter()
        .flat_map(|(_, g)| g.members.iter().map(|(_, r)| (*r).clone()))
        .collect();

    debug!(
        groups = ranked.len(),
        selected,
        records = records.len(),
        "ranked groups"
    );

    Ok(RankOutcome::Ranked(Ranking {
        groups: ranked.into_iter().map(|(s, _)| s).collect(),
        selected,
        records,
    }))
}
