//! Aggregator
//!
//! Groups transactions into time buckets (day/month/year), optionally scoped
//! or broken down by category. Buckets are recomputed from scratch on every
//! call; nothing is cached between requests.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::categories::CategoryTree;
use crate::error::Result;
use crate::models::{Bucket, CategoryKey, DateRange, Granularity, Totals, Transaction};

/// Restrict aggregation to part of the category tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "id", rename_all = "snake_case")]
pub enum CategoryFilter {
    /// Only transactions filed directly under this category
    Exact(i64),
    /// This category and all of its descendants, counted once
    RollUp(i64),
    /// Only transactions without a category
    Uncategorized,
}

impl CategoryFilter {
    /// Bucket key used when the filter is not combined with a grouping
    pub fn key(&self) -> CategoryKey {
        match self {
            Self::Exact(id) | Self::RollUp(id) => CategoryKey::Category(*id),
            Self::Uncategorized => CategoryKey::Uncategorized,
        }
    }

    fn category_id(&self) -> Option<i64> {
        match self {
            Self::Exact(id) | Self::RollUp(id) => Some(*id),
            Self::Uncategorized => None,
        }
    }

    fn matches(&self, tx: &Transaction, tree: &CategoryTree) -> bool {
        match (self, tx.category_id) {
            (Self::Exact(id), Some(category_id)) => category_id == *id,
            (Self::RollUp(id), Some(category_id)) => tree.is_within(category_id, *id),
            (Self::Uncategorized, None) => true,
            _ => false,
        }
    }
}

/// How transactions are broken down by category within each period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryGrouping {
    /// One bucket per transaction's own category
    Leaf,
    /// One bucket per top-level category
    TopLevel,
    /// Own category plus every ancestor, each bucket counting a transaction once
    WithAncestors,
}

impl CategoryGrouping {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leaf => "leaf",
            Self::TopLevel => "top_level",
            Self::WithAncestors => "with_ancestors",
        }
    }
}

impl std::str::FromStr for CategoryGrouping {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "leaf" => Ok(Self::Leaf),
            "top_level" | "top" | "parent" => Ok(Self::TopLevel),
            "with_ancestors" | "rollup" | "roll_up" => Ok(Self::WithAncestors),
            _ => Err(format!(
                "Unknown grouping: {} (valid: leaf, top-level, with-ancestors)",
                s
            )),
        }
    }
}

impl std::fmt::Display for CategoryGrouping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters of an aggregation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateQuery {
    pub granularity: Granularity,
    /// Inclusive range; when set, empty periods inside it are emitted as zeros
    pub range: Option<DateRange>,
    pub filter: Option<CategoryFilter>,
    pub grouping: Option<CategoryGrouping>,
}

impl AggregateQuery {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            range: None,
            filter: None,
            grouping: None,
        }
    }

    pub fn monthly() -> Self {
        Self::new(Granularity::Month)
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_filter(mut self, filter: CategoryFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_grouping(mut self, grouping: CategoryGrouping) -> Self {
        self.grouping = Some(grouping);
        self
    }

    /// Check the range and filter against the tree before any work happens
    pub fn validate(&self, tree: &CategoryTree) -> Result<()> {
        if let Some(range) = &self.range {
            range.validate()?;
        }
        if let Some(id) = self.filter.and_then(|f| f.category_id()) {
            tree.require(id)?;
        }
        Ok(())
    }

    pub(crate) fn includes(&self, tx: &Transaction, tree: &CategoryTree) -> bool {
        if let Some(range) = &self.range {
            if !range.contains(tx.date) {
                return false;
            }
        }
        match &self.filter {
            Some(filter) => filter.matches(tx, tree),
            None => true,
        }
    }

    /// Category chain of `category_id`, stopping at the filter's root
    fn lineage(&self, tree: &CategoryTree, category_id: i64) -> Vec<i64> {
        let root = self.filter.and_then(|f| f.category_id());
        let mut chain = Vec::new();
        for id in tree.ancestors(category_id) {
            chain.push(id);
            if Some(id) == root {
                break;
            }
        }
        chain
    }

    /// Bucket keys a transaction contributes to (never repeats a key)
    pub(crate) fn keys_for(&self, tx: &Transaction, tree: &CategoryTree) -> Vec<CategoryKey> {
        let Some(grouping) = self.grouping else {
            return vec![self.scope_key()];
        };
        let Some(category_id) = tx.category_id else {
            return vec![CategoryKey::Uncategorized];
        };

        match grouping {
            CategoryGrouping::Leaf => vec![CategoryKey::Category(category_id)],
            CategoryGrouping::TopLevel => {
                let chain = self.lineage(tree, category_id);
                let top = chain.last().copied().unwrap_or(category_id);
                vec![CategoryKey::Category(top)]
            }
            CategoryGrouping::WithAncestors => self
                .lineage(tree, category_id)
                .into_iter()
                .map(CategoryKey::Category)
                .collect(),
        }
    }

    fn scope_key(&self) -> CategoryKey {
        self.filter
            .map(|f| f.key())
            .unwrap_or(CategoryKey::All)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    total: f64,
    expense: f64,
    income: f64,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, tx: &Transaction) {
        self.total += tx.amount;
        if tx.is_expense() {
            self.expense += tx.amount;
        } else {
            self.income += tx.amount;
        }
        self.count += 1;
    }
}

/// Aggregate transactions into buckets sorted by period start, then category
pub fn aggregate(
    transactions: &[Transaction],
    tree: &CategoryTree,
    query: &AggregateQuery,
) -> Result<Vec<Bucket>> {
    query.validate(tree)?;

    let granularity = query.granularity;
    let mut accumulators: BTreeMap<(NaiveDate, CategoryKey), Accumulator> = BTreeMap::new();
    let mut seen_keys: BTreeSet<CategoryKey> = BTreeSet::new();
    let mut included = 0usize;

    for tx in transactions.iter().filter(|tx| query.includes(tx, tree)) {
        included += 1;
        let period = granularity.period_start(tx.date);
        for key in query.keys_for(tx, tree) {
            accumulators.entry((period, key)).or_default().add(tx);
            seen_keys.insert(key);
        }
    }

    if let Some(range) = &query.range {
        let keys: Vec<CategoryKey> = if query.grouping.is_some() {
            seen_keys.into_iter().collect()
        } else {
            vec![query.scope_key()]
        };
        for period in periods(range, granularity) {
            for key in &keys {
                accumulators.entry((period, *key)).or_default();
            }
        }
    }

    let mut running: HashMap<CategoryKey, f64> = HashMap::new();
    let buckets: Vec<Bucket> = accumulators
        .into_iter()
        .map(|((period_start, category), acc)| {
            let running_total = running.entry(category).or_insert(0.0);
            *running_total += acc.total;
            Bucket {
                period: granularity.label(period_start),
                period_start,
                category,
                category_name: category
                    .category_id()
                    .and_then(|id| tree.name(id))
                    .map(str::to_string),
                total: acc.total,
                expense_total: acc.expense,
                income_total: acc.income,
                count: acc.count,
                mean: if acc.count > 0 {
                    acc.total / acc.count as f64
                } else {
                    0.0
                },
                running_total: *running_total,
            }
        })
        .collect();

    debug!(
        transactions = transactions.len(),
        included,
        granularity = %granularity,
        buckets = buckets.len(),
        "Aggregation complete"
    );

    Ok(buckets)
}

/// Start dates of every period intersecting `range`
pub fn periods(range: &DateRange, granularity: Granularity) -> Vec<NaiveDate> {
    let mut starts = Vec::new();
    let mut current = Some(granularity.period_start(range.start));
    while let Some(start) = current {
        if start > range.end {
            break;
        }
        starts.push(start);
        current = granularity.next_period_start(start);
    }
    starts
}

/// Net, expense and income totals of a set of transactions
pub fn summarize<'a, I>(transactions: I) -> Totals
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut acc = Accumulator::default();
    for tx in transactions {
        acc.add(tx);
    }
    Totals {
        net: acc.total,
        expense: acc.expense,
        income: acc.income,
        count: acc.count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::Category;
    use crate::test_utils::*;

    const EPS: f64 = 1e-9;

    fn bucket_for<'a>(buckets: &'a [Bucket], period: &str, key: CategoryKey) -> &'a Bucket {
        buckets
            .iter()
            .find(|b| b.period == period && b.category == key)
            .unwrap_or_else(|| panic!("no bucket for {} {:?}", period, key))
    }

    #[test]
    fn test_monthly_net_expense_income_split() {
        let tree = CategoryTree::new(vec![
            Category::new(1, "Food", None),
            Category::new(2, "Salary", None),
        ])
        .unwrap();
        let transactions = vec![
            tx(1, "2024-01-05", -50.0, Some(1)),
            tx(2, "2024-01-20", -30.0, Some(1)),
            tx(3, "2024-01-01", 2000.0, Some(2)),
        ];

        let buckets = aggregate(&transactions, &tree, &AggregateQuery::monthly()).unwrap();

        assert_eq!(buckets.len(), 1);
        let jan = &buckets[0];
        assert_eq!(jan.period, "2024-01");
        assert_eq!(jan.category, CategoryKey::All);
        assert!((jan.total - 1920.0).abs() < EPS);
        assert!((jan.expense_total - -80.0).abs() < EPS);
        assert!((jan.income_total - 2000.0).abs() < EPS);
        assert_eq!(jan.count, 3);
        assert!((jan.mean - 640.0).abs() < EPS);
    }

    #[test]
    fn test_empty_input_yields_no_buckets() {
        let tree = sample_tree();
        let buckets = aggregate(&[], &tree, &AggregateQuery::monthly()).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_range_fills_empty_periods() {
        let tree = sample_tree();
        let transactions = vec![
            tx(1, "2024-01-10", -10.0, Some(FOOD)),
            tx(2, "2024-03-10", -20.0, Some(FOOD)),
        ];
        let query = AggregateQuery::monthly()
            .with_range(DateRange::new(date(2024, 1, 1), date(2024, 4, 30)).unwrap());

        let buckets = aggregate(&transactions, &tree, &query).unwrap();

        let periods: Vec<&str> = buckets.iter().map(|b| b.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-01", "2024-02", "2024-03", "2024-04"]);
        assert_eq!(buckets[1].count, 0);
        assert_eq!(buckets[1].total, 0.0);
        assert_eq!(buckets[1].mean, 0.0);
        assert_eq!(buckets[3].count, 0);
        assert!((buckets[3].running_total - -30.0).abs() < EPS);
    }

    #[test]
    fn test_without_range_gaps_are_omitted() {
        let tree = sample_tree();
        let transactions = vec![
            tx(1, "2024-01-10", -10.0, Some(FOOD)),
            tx(2, "2024-03-10", -20.0, Some(FOOD)),
        ];
        let buckets = aggregate(&transactions, &tree, &AggregateQuery::monthly()).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].period, "2024-01");
        assert_eq!(buckets[1].period, "2024-03");
    }

    #[test]
    fn test_range_excludes_outside_transactions() {
        let tree = sample_tree();
        let query = AggregateQuery::monthly()
            .with_range(DateRange::new(date(2024, 2, 1), date(2024, 2, 29)).unwrap());

        let buckets = aggregate(&sample_transactions(), &tree, &query).unwrap();

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].count, 4);
        assert!((buckets[0].total - 650.0).abs() < EPS);
    }

    #[test]
    fn test_inverted_range_fails() {
        let tree = sample_tree();
        let query = AggregateQuery::monthly().with_range(DateRange {
            start: date(2024, 3, 1),
            end: date(2024, 1, 1),
        });
        let result = aggregate(&sample_transactions(), &tree, &query);
        assert!(matches!(result, Err(Error::InvalidRange(_))));
    }

    #[test]
    fn test_unknown_filter_category_fails() {
        let tree = sample_tree();
        let query = AggregateQuery::monthly().with_filter(CategoryFilter::RollUp(404));
        let result = aggregate(&sample_transactions(), &tree, &query);
        assert!(matches!(result, Err(Error::UnknownCategory(404))));

        // Validation happens even when there is nothing to aggregate
        let result = aggregate(&[], &tree, &query);
        assert!(matches!(result, Err(Error::UnknownCategory(404))));
    }

    #[test]
    fn test_rollup_filter_counts_children_once() {
        let tree = sample_tree();
        let query = AggregateQuery::monthly().with_filter(CategoryFilter::RollUp(FOOD));

        let buckets = aggregate(&sample_transactions(), &tree, &query).unwrap();

        assert_eq!(buckets.len(), 3);
        let jan = bucket_for(&buckets, "2024-01", CategoryKey::Category(FOOD));
        assert!((jan.total - -80.0).abs() < EPS);
        assert_eq!(jan.count, 2);
        assert_eq!(jan.category_name.as_deref(), Some("Food"));
        let mar = bucket_for(&buckets, "2024-03", CategoryKey::Category(FOOD));
        assert_eq!(mar.count, 1);
    }

    #[test]
    fn test_exact_filter_ignores_children() {
        let tree = sample_tree();
        let query = AggregateQuery::monthly().with_filter(CategoryFilter::Exact(FOOD));
        let buckets = aggregate(&sample_transactions(), &tree, &query).unwrap();
        assert!(buckets.is_empty());

        let query = AggregateQuery::monthly().with_filter(CategoryFilter::Exact(GROCERIES));
        let buckets = aggregate(&sample_transactions(), &tree, &query).unwrap();
        assert_eq!(buckets.len(), 3);
    }

    #[test]
    fn test_uncategorized_filter() {
        let tree = sample_tree();
        let query = AggregateQuery::monthly().with_filter(CategoryFilter::Uncategorized);
        let buckets = aggregate(&sample_transactions(), &tree, &query).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].category, CategoryKey::Uncategorized);
        assert!((buckets[0].total - -12.5).abs() < EPS);
    }

    #[test]
    fn test_with_ancestors_parent_equals_sum_of_children() {
        let tree = sample_tree();
        let mut transactions = sample_transactions();
        // A transaction filed directly under the parent
        transactions.push(tx(13, "2024-02-20", -5.0, Some(FOOD)));
        let query = AggregateQuery::monthly().with_grouping(CategoryGrouping::WithAncestors);

        let buckets = aggregate(&transactions, &tree, &query).unwrap();

        for period in ["2024-01", "2024-02", "2024-03"] {
            let children: f64 = buckets
                .iter()
                .filter(|b| b.period == period)
                .filter(|b| {
                    matches!(b.category, CategoryKey::Category(id) if tree.parent(id) == Some(FOOD))
                })
                .map(|b| b.total)
                .sum();
            let direct: f64 = transactions
                .iter()
                .filter(|t| t.category_id == Some(FOOD) && Granularity::Month.label(t.date) == period)
                .map(|t| t.amount)
                .sum();
            let food = bucket_for(&buckets, period, CategoryKey::Category(FOOD));
            assert!((food.total - (children + direct)).abs() < EPS, "period {}", period);
        }

        let feb = bucket_for(&buckets, "2024-02", CategoryKey::Category(FOOD));
        assert_eq!(feb.count, 3);
        assert!((feb.total - -155.0).abs() < EPS);
    }

    #[test]
    fn test_top_level_grouping() {
        let tree = sample_tree();
        let query = AggregateQuery::monthly().with_grouping(CategoryGrouping::TopLevel);

        let buckets = aggregate(&sample_transactions(), &tree, &query).unwrap();

        let jan: Vec<CategoryKey> = buckets
            .iter()
            .filter(|b| b.period == "2024-01")
            .map(|b| b.category)
            .collect();
        assert_eq!(
            jan,
            vec![
                CategoryKey::Category(FOOD),
                CategoryKey::Category(SALARY),
                CategoryKey::Category(HOUSING),
            ]
        );
        let mar: Vec<CategoryKey> = buckets
            .iter()
            .filter(|b| b.period == "2024-03")
            .map(|b| b.category)
            .collect();
        assert_eq!(mar[0], CategoryKey::Uncategorized);
    }

    #[test]
    fn test_grouping_within_rollup_filter_stops_at_filter_root() {
        let tree = sample_tree();
        let query = AggregateQuery::monthly()
            .with_filter(CategoryFilter::RollUp(GROCERIES))
            .with_grouping(CategoryGrouping::WithAncestors);

        let buckets = aggregate(&sample_transactions(), &tree, &query).unwrap();

        assert!(buckets
            .iter()
            .all(|b| b.category == CategoryKey::Category(GROCERIES)));
        assert_eq!(buckets.len(), 3);
    }

    #[test]
    fn test_grouping_range_fill_uses_seen_categories() {
        let tree = sample_tree();
        let transactions = vec![
            tx(1, "2024-01-10", -10.0, Some(GROCERIES)),
            tx(2, "2024-02-10", -20.0, Some(HOUSING)),
        ];
        let query = AggregateQuery::monthly()
            .with_range(DateRange::new(date(2024, 1, 1), date(2024, 2, 29)).unwrap())
            .with_grouping(CategoryGrouping::Leaf);

        let buckets = aggregate(&transactions, &tree, &query).unwrap();

        assert_eq!(buckets.len(), 4);
        let feb_groceries = bucket_for(&buckets, "2024-02", CategoryKey::Category(GROCERIES));
        assert_eq!(feb_groceries.count, 0);
        assert!((feb_groceries.running_total - -10.0).abs() < EPS);
    }

    #[test]
    fn test_sum_of_buckets_equals_net_total() {
        let tree = sample_tree();
        let transactions = sample_transactions();
        for granularity in [Granularity::Day, Granularity::Month, Granularity::Year] {
            let buckets = aggregate(&transactions, &tree, &AggregateQuery::new(granularity)).unwrap();
            let bucket_sum: f64 = buckets.iter().map(|b| b.total).sum();
            let net = summarize(&transactions).net;
            assert!((bucket_sum - net).abs() < 1e-6, "{}", granularity);
            let last = buckets.last().unwrap();
            assert!((last.running_total - net).abs() < 1e-6);
        }
    }

    #[test]
    fn test_yearly_and_daily_labels() {
        let tree = sample_tree();
        let transactions = vec![
            tx(1, "2023-12-31", -10.0, None),
            tx(2, "2024-01-01", -20.0, None),
            tx(3, "2024-01-01", -5.0, None),
        ];
        let yearly = aggregate(&transactions, &tree, &AggregateQuery::new(Granularity::Year)).unwrap();
        assert_eq!(
            yearly.iter().map(|b| b.period.as_str()).collect::<Vec<_>>(),
            vec!["2023", "2024"]
        );

        let daily = aggregate(&transactions, &tree, &AggregateQuery::new(Granularity::Day)).unwrap();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[1].period, "2024-01-01");
        assert_eq!(daily[1].count, 2);
    }

    #[test]
    fn test_periods_helper() {
        let range = DateRange::new(date(2023, 11, 15), date(2024, 2, 1)).unwrap();
        assert_eq!(
            periods(&range, Granularity::Month),
            vec![
                date(2023, 11, 1),
                date(2023, 12, 1),
                date(2024, 1, 1),
                date(2024, 2, 1)
            ]
        );
        assert_eq!(periods(&range, Granularity::Year).len(), 2);
        assert_eq!(periods(&range, Granularity::Day).len() as i64, range.days());
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let tree = sample_tree();
        let transactions = sample_transactions();
        let query = AggregateQuery::monthly().with_grouping(CategoryGrouping::WithAncestors);
        let first = aggregate(&transactions, &tree, &query).unwrap();
        let second = aggregate(&transactions, &tree, &query).unwrap();
        assert_eq!(first, second);
    }
}
