//! Ordered, grouped registry of pending disposal work.
//!
//! A [`Disposables`] registry holds named groups of pending disposal items.
//! Groups run in a fixed order decided at registration time by
//! [`GroupConstraint`]s; items within a group run in registration order.
//! Disposal awaits each item to completion before the next one starts, so an
//! earlier group is fully drained before a later group begins.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{DisposalError, DisposalResult};
use crate::item::DisposalItem;

/// Name of the group items land in when none is specified. Always present.
pub const DEFAULT_DISPOSAL_GROUP: &str = "default";

/// Ordering constraint for a new group, relative to an existing one.
///
/// Every group except the default is registered with at least one
/// constraint. Constraints only reference groups that already exist, which
/// is what keeps the resulting order total and cycle-free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupConstraint {
    /// The new group runs before the named group
    Before(String),
    /// The new group runs after the named group
    After(String),
}

impl GroupConstraint {
    /// Constraint placing the new group before `other`.
    pub fn before(other: impl Into<String>) -> Self {
        GroupConstraint::Before(other.into())
    }

    /// Constraint placing the new group after `other`.
    pub fn after(other: impl Into<String>) -> Self {
        GroupConstraint::After(other.into())
    }
}

struct Group {
    name: String,
    items: Vec<DisposalItem>,
}

/// Snapshot of one pending item, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSummary {
    /// The item's name
    pub name: String,
    /// The timeout that will be enforced for it
    pub timeout: Duration,
}

/// Snapshot of one group's pending items, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    /// The group's name
    pub name: String,
    /// Pending items in disposal order
    pub items: Vec<ItemSummary>,
}

/// Snapshot of everything pending in a registry.
///
/// `total_timeout` is the sum of per-item budgets and is the time a caller
/// should allow for [`Disposables::dispose`] to complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisposalSummary {
    /// Registry label
    pub label: String,
    /// Sum of all pending items' timeouts
    pub total_timeout: Duration,
    /// Groups in disposal order, including empty ones
    pub groups: Vec<GroupSummary>,
}

impl fmt::Display for DisposalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} pending (budget {:?})",
            self.label,
            self.groups.iter().map(|g| g.items.len()).sum::<usize>(),
            self.total_timeout
        )?;
        for group in &self.groups {
            if group.items.is_empty() {
                continue;
            }
            write!(f, " [{}:", group.name)?;
            for item in &group.items {
                write!(f, " {} ({:?})", item.name, item.timeout)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// Registry of named disposal groups and their pending items.
///
/// The registry is `Send + Sync`; registration takes `&self` behind an
/// internal lock, so a fixture can be shared across tasks within one test.
/// The lock is never held across an await point.
///
/// # Examples
///
/// ```
/// use test_disposables::{Disposables, DisposalItem, GroupConstraint, DEFAULT_DISPOSAL_GROUP};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let disposables = Disposables::new("demo");
/// disposables
///     .register_group("connections", [GroupConstraint::before(DEFAULT_DISPOSAL_GROUP)])
///     .unwrap();
///
/// disposables
///     .add(DisposalItem::new_sync("stop server", || { /* ... */ }))
///     .unwrap();
///
/// // Runs before "stop server" despite being registered later.
/// let opts = test_disposables::DisposalOptions::new("close socket").in_group("connections");
/// disposables.add(DisposalItem::new_sync(opts, || { /* ... */ })).unwrap();
///
/// disposables.dispose().await.unwrap();
/// assert_eq!(disposables.list().total_timeout, std::time::Duration::ZERO);
/// # });
/// ```
pub struct Disposables {
    label: String,
    groups: Mutex<Vec<Group>>,
}

impl Disposables {
    /// Creates a registry containing only the default group. The label shows
    /// up in diagnostics when teardown fails.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            groups: Mutex::new(vec![Group {
                name: DEFAULT_DISPOSAL_GROUP.to_string(),
                items: Vec::new(),
            }]),
        }
    }

    /// The registry's label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Registers a new group, placed according to `constraints`.
    ///
    /// The group is inserted at the earliest position satisfying every
    /// `Before` constraint and strictly after every `After` target. Errors:
    ///
    /// - [`DisposalError::DuplicateGroup`] if the name is taken
    /// - [`DisposalError::EmptyConstraints`] if no constraint was given
    /// - [`DisposalError::UnknownGroup`] if a constraint references a group
    ///   that was never registered
    /// - [`DisposalError::ConstraintConflict`] if an `After` target sits at
    ///   or past a `Before` target
    pub fn register_group(
        &self,
        name: impl Into<String>,
        constraints: impl IntoIterator<Item = GroupConstraint>,
    ) -> DisposalResult<()> {
        let name = name.into();
        let constraints: Vec<GroupConstraint> = constraints.into_iter().collect();
        if constraints.is_empty() {
            return Err(DisposalError::EmptyConstraints(name));
        }

        let mut groups = self.groups.lock().unwrap();
        if groups.iter().any(|g| g.name == name) {
            return Err(DisposalError::DuplicateGroup(name));
        }

        // Resolve each constraint to a position among the existing groups.
        let mut min_before: Option<(usize, &str)> = None;
        let mut max_after: Option<(usize, &str)> = None;
        for constraint in &constraints {
            let (target, is_before) = match constraint {
                GroupConstraint::Before(t) => (t.as_str(), true),
                GroupConstraint::After(t) => (t.as_str(), false),
            };
            let idx = groups
                .iter()
                .position(|g| g.name == target)
                .ok_or_else(|| DisposalError::UnknownGroup(target.to_string()))?;
            if is_before {
                if min_before.map_or(true, |(i, _)| idx < i) {
                    min_before = Some((idx, target));
                }
            } else if max_after.map_or(true, |(i, _)| idx > i) {
                max_after = Some((idx, target));
            }
        }

        let position = match (max_after, min_before) {
            (Some((after_idx, after_name)), Some((before_idx, before_name))) => {
                if after_idx >= before_idx {
                    return Err(DisposalError::ConstraintConflict {
                        group: name,
                        detail: format!(
                            "cannot run both after {} and before {}",
                            after_name, before_name
                        ),
                    });
                }
                before_idx
            }
            (None, Some((before_idx, _))) => before_idx,
            (Some((after_idx, _)), None) => after_idx + 1,
            (None, None) => unreachable!("constraints checked non-empty"),
        };

        groups.insert(
            position,
            Group {
                name,
                items: Vec::new(),
            },
        );
        Ok(())
    }

    /// Adds a pending item to its group (the default group when the item's
    /// options name none).
    ///
    /// Errors with [`DisposalError::UnknownGroup`] for an unregistered
    /// group, [`DisposalError::DuplicateItem`] when an item of the same name
    /// is already pending, and [`DisposalError::InvalidTimeout`] for a zero
    /// timeout.
    pub fn add(&self, item: DisposalItem) -> DisposalResult<()> {
        if item.options.timeout == Some(Duration::ZERO) {
            return Err(DisposalError::InvalidTimeout(item.options.name));
        }

        let mut groups = self.groups.lock().unwrap();
        if groups
            .iter()
            .flat_map(|g| g.items.iter())
            .any(|pending| pending.options.name == item.options.name)
        {
            return Err(DisposalError::DuplicateItem(item.options.name));
        }

        let group_name = item.options.group.as_deref().unwrap_or(DEFAULT_DISPOSAL_GROUP);
        let group = groups
            .iter_mut()
            .find(|g| g.name == group_name)
            .ok_or_else(|| DisposalError::UnknownGroup(group_name.to_string()))?;
        group.items.push(item);
        Ok(())
    }

    /// Snapshots the pending items and their summed timeout budget.
    pub fn list(&self) -> DisposalSummary {
        let groups = self.groups.lock().unwrap();
        let group_summaries: Vec<GroupSummary> = groups
            .iter()
            .map(|g| GroupSummary {
                name: g.name.clone(),
                items: g
                    .items
                    .iter()
                    .map(|item| ItemSummary {
                        name: item.options.name.clone(),
                        timeout: item.options.effective_timeout(),
                    })
                    .collect(),
            })
            .collect();
        let total_timeout = group_summaries
            .iter()
            .flat_map(|g| g.items.iter())
            .map(|i| i.timeout)
            .sum();
        DisposalSummary {
            label: self.label.clone(),
            total_timeout,
            groups: group_summaries,
        }
    }

    /// Disposes every pending item, in group order then registration order,
    /// awaiting each item under its own timeout.
    ///
    /// Stops at the first failure: the failing item is consumed, items
    /// disposed so far are gone, and later items stay pending so a caller
    /// can report them. Items registered while disposal is running are
    /// drained too.
    pub async fn dispose(&self) -> DisposalResult<()> {
        loop {
            let next = {
                let mut groups = self.groups.lock().unwrap();
                groups
                    .iter_mut()
                    .find(|g| !g.items.is_empty())
                    .map(|g| g.items.remove(0))
            };
            let Some(item) = next else {
                return Ok(());
            };

            let budget = item.options.effective_timeout();
            let name = item.options.name;
            tracing::debug!(registry = %self.label, item = %name, ?budget, "disposing");
            match tokio::time::timeout(budget, (item.dispose)()).await {
                Ok(Ok(())) => {}
                Ok(Err(source)) => return Err(DisposalError::DisposeFailed { name, source }),
                Err(_) => {
                    return Err(DisposalError::Timeout {
                        name,
                        after: budget,
                    })
                }
            }
        }
    }
}

impl fmt::Debug for Disposables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposables")
            .field("label", &self.label)
            .field("pending", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{DisposalOptions, DEFAULT_ITEM_TIMEOUT};

    fn noop(name: &str) -> DisposalItem {
        DisposalItem::new_sync(name, || {})
    }

    #[test]
    fn default_group_always_exists() {
        let d = Disposables::new("t");
        assert!(d.add(noop("a")).is_ok());
        let summary = d.list();
        assert_eq!(summary.groups.len(), 1);
        assert_eq!(summary.groups[0].name, DEFAULT_DISPOSAL_GROUP);
    }

    #[test]
    fn group_requires_constraints() {
        let d = Disposables::new("t");
        let err = d.register_group("g", []).unwrap_err();
        assert!(matches!(err, DisposalError::EmptyConstraints(_)));
    }

    #[test]
    fn unknown_constraint_target_rejected() {
        let d = Disposables::new("t");
        let err = d
            .register_group("g", [GroupConstraint::before("missing")])
            .unwrap_err();
        assert!(matches!(err, DisposalError::UnknownGroup(name) if name == "missing"));
    }

    #[test]
    fn conflicting_constraints_rejected() {
        let d = Disposables::new("t");
        d.register_group("first", [GroupConstraint::before(DEFAULT_DISPOSAL_GROUP)])
            .unwrap();
        // after(default) puts it past default, before(first) puts it before
        // the earliest group. Both cannot hold.
        let err = d
            .register_group(
                "g",
                [
                    GroupConstraint::after(DEFAULT_DISPOSAL_GROUP),
                    GroupConstraint::before("first"),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, DisposalError::ConstraintConflict { .. }));
    }

    #[test]
    fn before_and_after_place_between() {
        let d = Disposables::new("t");
        d.register_group("last", [GroupConstraint::after(DEFAULT_DISPOSAL_GROUP)])
            .unwrap();
        d.register_group(
            "middle",
            [
                GroupConstraint::after(DEFAULT_DISPOSAL_GROUP),
                GroupConstraint::before("last"),
            ],
        )
        .unwrap();
        let names: Vec<String> = d.list().groups.into_iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["default", "middle", "last"]);
    }

    #[test]
    fn duplicate_item_name_rejected() {
        let d = Disposables::new("t");
        d.add(noop("a")).unwrap();
        let err = d.add(noop("a")).unwrap_err();
        assert!(matches!(err, DisposalError::DuplicateItem(name) if name == "a"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let d = Disposables::new("t");
        let opts = DisposalOptions::new("a").with_timeout(Duration::ZERO);
        let err = d.add(DisposalItem::new_sync(opts, || {})).unwrap_err();
        assert!(matches!(err, DisposalError::InvalidTimeout(_)));
    }

    #[test]
    fn total_timeout_sums_defaults_and_explicit() {
        let d = Disposables::new("t");
        d.add(noop("a")).unwrap();
        let opts = DisposalOptions::new("b").with_timeout(Duration::from_millis(250));
        d.add(DisposalItem::new_sync(opts, || {})).unwrap();
        assert_eq!(
            d.list().total_timeout,
            DEFAULT_ITEM_TIMEOUT + Duration::from_millis(250)
        );
    }

    #[tokio::test]
    async fn dispose_drains_everything() {
        let d = Disposables::new("t");
        d.add(noop("a")).unwrap();
        d.add(noop("b")).unwrap();
        d.dispose().await.unwrap();
        assert_eq!(d.list().total_timeout, Duration::ZERO);
    }
}
