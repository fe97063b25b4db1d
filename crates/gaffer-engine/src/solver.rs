// Exact 0/1 selection solver (branch-and-bound).
//
// Maximizes the total score of a selection subject to an exact item count,
// per-category [min, max] counts, an optional budget and an optional cap on
// items per group. Used for both squad selection (exact position counts,
// budget, team cap) and lineup selection (formation bounds only).
//
// Items are explored by score descending, then id ascending. Selections whose
// scores agree within EPS are ordered by their ascending id lists, and the
// lexicographically smaller list wins, so results are reproducible.
//
// Pruning:
// - dominance presolve (removes items that can always be swapped for a
//   better, no more expensive item of the same category),
// - count feasibility against the remaining items of each category,
// - a budget lower bound from the cheapest way to meet every minimum,
// - a Lagrangian upper bound: the budget constraint is relaxed with
//   multiplier lambda and the remaining picks are filled greedily under the
//   category caps. Several multipliers are tried and the tightest bound used.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use gaffer_core::model::{PlayerId, TeamId};

use crate::error::{invalid, EngineError, Result};

const EPS: f64 = 1e-9;
/// Nodes between wall-clock checks.
const TIME_CHECK_INTERVAL: u64 = 1024;
const LAMBDA_SEARCH_STEPS: usize = 60;

// ---------------------------------------------------------------------------
// Problem / solution types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Item {
    pub id: PlayerId,
    /// Index into `Problem::bounds`.
    pub category: usize,
    pub group: TeamId,
    pub cost: u32,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: usize,
    pub max: usize,
}

impl Bounds {
    pub fn exact(n: usize) -> Self {
        Bounds { min: n, max: n }
    }

    pub fn range(min: usize, max: usize) -> Self {
        Bounds { min, max }
    }
}

#[derive(Debug, Clone)]
pub struct Problem {
    pub items: Vec<Item>,
    /// Exact number of items to select.
    pub count: usize,
    pub budget: Option<u32>,
    pub bounds: Vec<Bounds>,
    /// Maximum selected items sharing a group.
    pub group_cap: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Selected ids, ascending.
    pub ids: Vec<PlayerId>,
    pub total_score: f64,
    pub total_cost: u32,
    /// False when the time budget ran out before the search completed.
    pub optimal: bool,
    pub nodes: u64,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Solve `problem` exactly, or return the best selection found within
/// `time_budget` flagged `optimal: false`.
pub fn solve(problem: &Problem, time_budget: Duration) -> Result<Solution> {
    validate(problem)?;

    let started = Instant::now();
    let items = presolve(problem);
    debug!(
        "solver presolve kept {} of {} items",
        items.len(),
        problem.items.len()
    );
    check_root(problem, &items)?;

    let mut search = Search::new(problem, items, started.checked_add(time_budget));
    search.search(0);

    let optimal = !search.timed_out;
    let nodes = search.nodes;
    let elapsed_ms = started.elapsed().as_millis();

    let Some(best) = search.best.take() else {
        if search.timed_out {
            warn!("solver timed out after {nodes} nodes without a feasible selection");
            return Err(EngineError::SolverTimeout {
                budget_ms: time_budget.as_millis() as u64,
            });
        }
        return Err(EngineError::Infeasible(
            "no selection satisfies the count, budget and group constraints".into(),
        ));
    };

    let mut chosen: Vec<&Item> = best.iter().map(|&i| &search.items[i]).collect();
    chosen.sort_by_key(|item| item.id);
    let solution = Solution {
        ids: chosen.iter().map(|item| item.id).collect(),
        total_score: chosen.iter().map(|item| item.score).sum(),
        total_cost: chosen.iter().map(|item| item.cost).sum(),
        optimal,
        nodes,
    };

    if optimal {
        info!(
            "solver finished: score {:.2}, cost {}, {} nodes in {}ms",
            solution.total_score, solution.total_cost, nodes, elapsed_ms
        );
    } else {
        warn!(
            "solver hit its {}ms budget; returning best found (score {:.2}, {} nodes)",
            time_budget.as_millis(),
            solution.total_score,
            nodes
        );
    }
    Ok(solution)
}

/// Exploration order: score descending, then id ascending.
fn explore_order(a: &Item, b: &Item) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then(a.id.cmp(&b.id))
}

// ---------------------------------------------------------------------------
// Validation & presolve
// ---------------------------------------------------------------------------

fn validate(problem: &Problem) -> Result<()> {
    if problem.bounds.is_empty() {
        return Err(invalid("solver problem has no categories"));
    }
    if problem.group_cap == Some(0) {
        return Err(invalid("group cap must be positive"));
    }
    if let Some(b) = problem.bounds.iter().find(|b| b.min > b.max) {
        return Err(invalid(format!(
            "category bounds min {} exceeds max {}",
            b.min, b.max
        )));
    }

    let mut seen = HashSet::with_capacity(problem.items.len());
    for item in &problem.items {
        if item.category >= problem.bounds.len() {
            return Err(invalid(format!(
                "item {} has unknown category {}",
                item.id, item.category
            )));
        }
        if !item.score.is_finite() {
            return Err(invalid(format!("item {} has a non-finite score", item.id)));
        }
        if !seen.insert(item.id) {
            return Err(invalid(format!("duplicate item id {}", item.id)));
        }
    }

    let min_total: usize = problem.bounds.iter().map(|b| b.min).sum();
    let max_total: usize = problem.bounds.iter().map(|b| b.max).sum();
    if problem.count < min_total || problem.count > max_total {
        return Err(EngineError::Infeasible(format!(
            "selecting {} items is incompatible with category bounds {}..={}",
            problem.count, min_total, max_total
        )));
    }
    Ok(())
}

/// Drop items that some optimal selection never needs, and return the rest in
/// exploration order.
///
/// An item `p` is dominated by an item `q` of the same category that comes
/// earlier in exploration order and costs no more; on equal scores `q` has the
/// lower id, so swapping it in never loses a tie. If `p` is selected, at
/// most `max - 1` of its dominators are selected, and (with a group cap) at
/// most `(count - 1) / cap` other groups are full. When the dominators span
/// more groups than both of those together, one of them can always replace
/// `p` without breaking a constraint or lowering the score, so `p` is safe
/// to remove.
fn presolve(problem: &Problem) -> Vec<Item> {
    let mut items = problem.items.clone();
    items.sort_by(explore_order);

    let full_groups = problem
        .group_cap
        .map_or(0, |cap| problem.count.saturating_sub(1) / cap);
    let cost_matters = problem.budget.is_some();

    let keep: Vec<bool> = items
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let required = problem.bounds[p.category].max + full_groups;
            let dominators = items[..i]
                .iter()
                .filter(|q| q.category == p.category && (!cost_matters || q.cost <= p.cost));
            match problem.group_cap {
                Some(_) => {
                    let mut groups = HashSet::new();
                    for q in dominators {
                        groups.insert(q.group);
                        if groups.len() >= required {
                            return false;
                        }
                    }
                    true
                }
                None => dominators.count() < required,
            }
        })
        .collect();

    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, keep)| keep.then_some(item))
        .collect()
}

/// Reject problems that are infeasible before any branching.
fn check_root(problem: &Problem, items: &[Item]) -> Result<()> {
    let mut available = vec![0usize; problem.bounds.len()];
    for item in items {
        available[item.category] += 1;
    }

    let mut reachable = 0;
    for (c, (bounds, &avail)) in problem.bounds.iter().zip(&available).enumerate() {
        if avail < bounds.min {
            return Err(EngineError::Infeasible(format!(
                "category {c} needs {} items but only {avail} are eligible",
                bounds.min
            )));
        }
        reachable += avail.min(bounds.max);
    }
    if reachable < problem.count {
        return Err(EngineError::Infeasible(format!(
            "only {reachable} items can be selected within the category limits, {} required",
            problem.count
        )));
    }

    if let Some(budget) = problem.budget {
        let prefix = CheapestCosts::new(items, problem.bounds.len());
        let zero = vec![0usize; problem.bounds.len()];
        match prefix.min_completion(&problem.bounds, &zero, problem.count) {
            Some(cost) if cost <= u64::from(budget) => {}
            Some(cost) => {
                return Err(EngineError::Infeasible(format!(
                    "the cheapest legal selection costs {cost}, budget is {budget}"
                )));
            }
            None => {
                return Err(EngineError::Infeasible(
                    "not enough items to meet the category minimums".into(),
                ));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Prefix sums of ascending costs, per category and overall.
struct CheapestCosts {
    per_category: Vec<Vec<u64>>,
    overall: Vec<u64>,
}

impl CheapestCosts {
    fn new(items: &[Item], categories: usize) -> Self {
        let prefix = |mut costs: Vec<u64>| {
            costs.sort_unstable();
            let mut sums = Vec::with_capacity(costs.len() + 1);
            sums.push(0);
            let mut acc = 0u64;
            for c in costs {
                acc += c;
                sums.push(acc);
            }
            sums
        };
        let per_category = (0..categories)
            .map(|c| {
                prefix(
                    items
                        .iter()
                        .filter(|i| i.category == c)
                        .map(|i| u64::from(i.cost))
                        .collect(),
                )
            })
            .collect();
        let overall = prefix(items.iter().map(|i| u64::from(i.cost)).collect());
        CheapestCosts {
            per_category,
            overall,
        }
    }

    /// Lower bound on the cost of adding `needed` more items while meeting
    /// every category minimum. `None` when the minimums cannot be met.
    fn min_completion(&self, bounds: &[Bounds], counts: &[usize], needed: usize) -> Option<u64> {
        let mut total = 0u64;
        let mut required = 0usize;
        for ((b, &n), sums) in bounds.iter().zip(counts).zip(&self.per_category) {
            let need = b.min.saturating_sub(n);
            total += *sums.get(need)?;
            required += need;
        }
        let rest = needed.checked_sub(required)?;
        total += *self.overall.get(rest)?;
        Some(total)
    }
}

/// Item indices ordered by Lagrangian-adjusted score, descending.
fn adjusted_order(items: &[Item], lambda: f64) -> Vec<usize> {
    let adjusted: Vec<f64> = items
        .iter()
        .map(|i| i.score - lambda * f64::from(i.cost))
        .collect();
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| {
        adjusted[b]
            .partial_cmp(&adjusted[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    order
}

/// Greedy fill of `needed` picks from items at index `start` or later under
/// per-category caps, maximizing `score - lambda * cost`. Returns the total
/// adjusted value and the smallest index used (`usize::MAX` when none).
fn greedy_completion(
    items: &[Item],
    order: &[usize],
    start: usize,
    caps: &mut [usize],
    needed: usize,
    lambda: f64,
) -> Option<(f64, usize)> {
    let mut taken = 0;
    let mut total = 0.0;
    let mut lowest = usize::MAX;
    for &idx in order {
        if taken == needed {
            break;
        }
        if idx < start {
            continue;
        }
        let item = &items[idx];
        let cap = &mut caps[item.category];
        if *cap == 0 {
            continue;
        }
        *cap -= 1;
        taken += 1;
        total += item.score - lambda * f64::from(item.cost);
        lowest = lowest.min(idx);
    }
    (taken == needed).then_some((total, lowest))
}

/// Multiplier minimizing the root bound. The bound is convex in lambda, so a
/// ternary search over [0, best score-per-cost] suffices.
fn root_lambda(items: &[Item], bounds: &[Bounds], count: usize, budget: u32) -> f64 {
    let hi = items
        .iter()
        .filter(|i| i.cost > 0)
        .map(|i| i.score / f64::from(i.cost))
        .fold(0.0, f64::max);
    if hi <= 0.0 {
        return 0.0;
    }

    let bound = |lambda: f64| {
        let order = adjusted_order(items, lambda);
        let mut caps: Vec<usize> = bounds.iter().map(|b| b.max).collect();
        greedy_completion(items, &order, 0, &mut caps, count, lambda)
            .map_or(f64::INFINITY, |(v, _)| v + lambda * f64::from(budget))
    };

    let (mut lo, mut hi) = (0.0, hi);
    for _ in 0..LAMBDA_SEARCH_STEPS {
        let m1 = lo + (hi - lo) / 3.0;
        let m2 = hi - (hi - lo) / 3.0;
        if bound(m1) <= bound(m2) {
            hi = m2;
        } else {
            lo = m1;
        }
    }
    (lo + hi) / 2.0
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

struct Search<'p> {
    items: Vec<Item>,
    bounds: &'p [Bounds],
    count: usize,
    budget: Option<u32>,
    group_cap: Option<usize>,
    /// Dense group index per item.
    groups: Vec<usize>,
    /// `suffix[j][c]`: items of category `c` at index `j` or later.
    suffix: Vec<Vec<usize>>,
    cheapest: CheapestCosts,
    lambdas: Vec<(f64, Vec<usize>)>,
    scratch: Vec<usize>,

    chosen: Vec<usize>,
    category_counts: Vec<usize>,
    group_counts: Vec<usize>,
    cost: u32,
    score: f64,

    best: Option<Vec<usize>>,
    /// Ids of `best`, ascending.
    best_ids: Vec<PlayerId>,
    best_score: f64,
    nodes: u64,
    deadline: Option<Instant>,
    timed_out: bool,
}

impl<'p> Search<'p> {
    fn new(problem: &'p Problem, items: Vec<Item>, deadline: Option<Instant>) -> Self {
        let categories = problem.bounds.len();

        let mut group_index: HashMap<TeamId, usize> = HashMap::new();
        let groups: Vec<usize> = items
            .iter()
            .map(|item| {
                let next = group_index.len();
                *group_index.entry(item.group).or_insert(next)
            })
            .collect();

        let mut suffix = vec![vec![0usize; categories]; items.len() + 1];
        for j in (0..items.len()).rev() {
            suffix[j] = suffix[j + 1].clone();
            suffix[j][items[j].category] += 1;
        }

        let lambdas = match problem.budget {
            Some(budget) => {
                let star = root_lambda(&items, &problem.bounds, problem.count, budget);
                let mut set = vec![star, 0.0, star * 0.5, star * 1.5];
                set.dedup_by(|a, b| (*a - *b).abs() < EPS);
                set.into_iter()
                    .map(|l| (l, adjusted_order(&items, l)))
                    .collect()
            }
            None => vec![(0.0, adjusted_order(&items, 0.0))],
        };
        debug!(
            "solver multipliers: {:?}",
            lambdas.iter().map(|(l, _)| *l).collect::<Vec<_>>()
        );

        Search {
            cheapest: CheapestCosts::new(&items, categories),
            bounds: &problem.bounds,
            count: problem.count,
            budget: problem.budget,
            group_cap: problem.group_cap,
            group_counts: vec![0; group_index.len()],
            groups,
            suffix,
            lambdas,
            scratch: Vec::with_capacity(categories),
            chosen: Vec::with_capacity(problem.count),
            category_counts: vec![0; categories],
            cost: 0,
            score: 0.0,
            best: None,
            best_ids: Vec::new(),
            best_score: f64::NEG_INFINITY,
            nodes: 0,
            deadline,
            timed_out: false,
            items,
        }
    }

    fn search(&mut self, start: usize) {
        self.nodes += 1;
        if self.nodes % TIME_CHECK_INTERVAL == 0 {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    self.timed_out = true;
                }
            }
        }
        if self.timed_out {
            return;
        }
        if self.chosen.len() == self.count {
            self.record();
            return;
        }
        if !self.budget_feasible() {
            return;
        }

        let mut cached: Vec<Option<(f64, usize)>> = vec![None; self.lambdas.len()];
        for j in start..self.items.len() {
            if self.timed_out {
                return;
            }
            // Both checks only get stricter as `j` grows, so failing ends the loop.
            if !self.counts_feasible(j) {
                break;
            }
            match self.upper_bound(j, &mut cached) {
                Some(ub) if self.worth_exploring(ub, j) => {}
                _ => break,
            }
            if !self.can_take(j) {
                continue;
            }

            let saved_score = self.score;
            self.take(j);
            self.search(j + 1);
            self.untake(j);
            self.score = saved_score;
        }
    }

    /// Whether a subtree bounded by `ub` using items `j..` can beat the
    /// incumbent, either on score or as a tie with lower ids. Neither test
    /// gets easier as `j` grows.
    fn worth_exploring(&self, ub: f64, j: usize) -> bool {
        if self.best.is_none() || ub > self.best_score + EPS {
            return true;
        }
        if ub < self.best_score - EPS {
            return false;
        }
        // Lowest id list any completion from `j` could have.
        let mut ids: Vec<PlayerId> = self.items[j..].iter().map(|i| i.id).collect();
        ids.sort_unstable();
        ids.truncate(self.needed());
        ids.extend(self.chosen.iter().map(|&c| self.items[c].id));
        ids.sort_unstable();
        ids < self.best_ids
    }

    fn record(&mut self) {
        let meets_minimums = self
            .bounds
            .iter()
            .zip(&self.category_counts)
            .all(|(b, &n)| n >= b.min);
        if !meets_minimums {
            return;
        }
        let mut ids: Vec<PlayerId> = self.chosen.iter().map(|&c| self.items[c].id).collect();
        ids.sort_unstable();
        let better = match self.best {
            None => true,
            Some(_) if self.score > self.best_score + EPS => true,
            Some(_) => self.score >= self.best_score - EPS && ids < self.best_ids,
        };
        if better {
            debug!(
                "new incumbent {:.3} (cost {}) at node {}",
                self.score, self.cost, self.nodes
            );
            self.best = Some(self.chosen.clone());
            self.best_ids = ids;
            self.best_score = self.score;
        }
    }

    fn needed(&self) -> usize {
        self.count - self.chosen.len()
    }

    fn counts_feasible(&self, j: usize) -> bool {
        let needed = self.needed();
        if self.items.len() - j < needed {
            return false;
        }
        let mut required = 0;
        for ((b, &n), &avail) in self
            .bounds
            .iter()
            .zip(&self.category_counts)
            .zip(&self.suffix[j])
        {
            let need = b.min.saturating_sub(n);
            if avail < need {
                return false;
            }
            required += need;
        }
        required <= needed
    }

    fn budget_feasible(&self) -> bool {
        let Some(budget) = self.budget else {
            return true;
        };
        match self
            .cheapest
            .min_completion(self.bounds, &self.category_counts, self.needed())
        {
            Some(extra) => u64::from(self.cost) + extra <= u64::from(budget),
            None => false,
        }
    }

    /// Tightest Lagrangian bound on any completion using items `j..`.
    /// `cached` carries each multiplier's greedy result from the previous `j`;
    /// it stays valid while the greedy fill did not use the dropped item.
    fn upper_bound(&mut self, j: usize, cached: &mut [Option<(f64, usize)>]) -> Option<f64> {
        let needed = self.needed();
        let remaining = self
            .budget
            .map_or(0.0, |b| f64::from(b.saturating_sub(self.cost)));

        let Search {
            items,
            bounds,
            lambdas,
            scratch,
            category_counts,
            score,
            ..
        } = self;

        let mut tightest = f64::INFINITY;
        for ((lambda, order), slot) in lambdas.iter().zip(cached.iter_mut()) {
            let value = match *slot {
                Some((value, lowest)) if lowest >= j => value,
                _ => {
                    scratch.clear();
                    scratch.extend(
                        bounds
                            .iter()
                            .zip(category_counts.iter())
                            .map(|(b, &n)| b.max.saturating_sub(n)),
                    );
                    let fresh = greedy_completion(items, order, j, scratch, needed, *lambda)?;
                    *slot = Some(fresh);
                    fresh.0
                }
            };
            tightest = tightest.min(*score + lambda * remaining + value);
        }
        Some(tightest)
    }

    fn can_take(&self, j: usize) -> bool {
        let item = &self.items[j];
        if self.category_counts[item.category] >= self.bounds[item.category].max {
            return false;
        }
        if let Some(cap) = self.group_cap {
            if self.group_counts[self.groups[j]] >= cap {
                return false;
            }
        }
        match self.budget {
            Some(budget) => self.cost + item.cost <= budget,
            None => true,
        }
    }

    fn take(&mut self, j: usize) {
        let item = self.items[j];
        self.chosen.push(j);
        self.category_counts[item.category] += 1;
        self.group_counts[self.groups[j]] += 1;
        self.cost += item.cost;
        self.score += item.score;
    }

    fn untake(&mut self, j: usize) {
        let item = self.items[j];
        self.chosen.pop();
        self.category_counts[item.category] -= 1;
        self.group_counts[self.groups[j]] -= 1;
        self.cost -= item.cost;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: PlayerId, category: usize, group: TeamId, cost: u32, score: f64) -> Item {
        Item {
            id,
            category,
            group,
            cost,
            score,
        }
    }

    const LONG: Duration = Duration::from_secs(30);

    /// Exhaustive search over all subsets; returns the best total score and,
    /// among ties, the lowest ascending id list.
    fn brute_force(problem: &Problem) -> Option<(f64, Vec<PlayerId>)> {
        let n = problem.items.len();
        assert!(n <= 20);
        let mut best: Option<(f64, Vec<PlayerId>)> = None;
        for mask in 0u32..(1 << n) {
            if mask.count_ones() as usize != problem.count {
                continue;
            }
            let chosen: Vec<&Item> = (0..n)
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| &problem.items[i])
                .collect();
            let cost: u32 = chosen.iter().map(|i| i.cost).sum();
            if problem.budget.is_some_and(|b| cost > b) {
                continue;
            }
            let ok_categories = problem.bounds.iter().enumerate().all(|(c, b)| {
                let n = chosen.iter().filter(|i| i.category == c).count();
                n >= b.min && n <= b.max
            });
            if !ok_categories {
                continue;
            }
            if let Some(cap) = problem.group_cap {
                let mut counts: HashMap<TeamId, usize> = HashMap::new();
                for i in &chosen {
                    *counts.entry(i.group).or_default() += 1;
                }
                if counts.values().any(|&n| n > cap) {
                    continue;
                }
            }
            let score: f64 = chosen.iter().map(|i| i.score).sum();
            let mut ids: Vec<PlayerId> = chosen.iter().map(|i| i.id).collect();
            ids.sort_unstable();
            let better = match &best {
                None => true,
                Some((b, b_ids)) => score > b + EPS || (score >= b - EPS && ids < *b_ids),
            };
            if better {
                best = Some((score, ids));
            }
        }
        best
    }

    /// Small deterministic pseudo-random generator for test data.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, modulo: u64) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 33) % modulo
        }
    }

    fn random_problem(seed: u64, budget: u32) -> Problem {
        let mut rng = Lcg(seed);
        let items = (0..14)
            .map(|i| {
                item(
                    i + 1,
                    (i % 3) as usize,
                    rng.next(4) as TeamId,
                    40 + rng.next(60) as u32,
                    rng.next(100) as f64 / 10.0,
                )
            })
            .collect();
        Problem {
            items,
            count: 6,
            budget: Some(budget),
            bounds: vec![Bounds::range(1, 2), Bounds::range(2, 3), Bounds::range(1, 3)],
            group_cap: Some(2),
        }
    }

    #[test]
    fn matches_brute_force_on_random_problems() {
        for seed in 0..40 {
            for budget in [300, 380, 460] {
                let problem = random_problem(seed, budget);
                let expected = brute_force(&problem);
                match (solve(&problem, LONG), expected) {
                    (Ok(sol), Some((best, best_ids))) => {
                        assert!(
                            (sol.total_score - best).abs() < 1e-6,
                            "seed {seed} budget {budget}: solver {} vs brute force {best}",
                            sol.total_score
                        );
                        assert_eq!(sol.ids, best_ids, "seed {seed} budget {budget}");
                        assert!(sol.optimal);
                        assert!(sol.total_cost <= budget);
                    }
                    (Err(EngineError::Infeasible(_)), None) => {}
                    (got, want) => panic!("seed {seed} budget {budget}: {got:?} vs {want:?}"),
                }
            }
        }
    }

    #[test]
    fn ties_resolve_to_lower_ids() {
        let problem = Problem {
            items: vec![
                item(4, 0, 1, 10, 5.0),
                item(2, 0, 2, 10, 5.0),
                item(3, 0, 3, 10, 5.0),
                item(1, 0, 4, 10, 5.0),
            ],
            count: 2,
            budget: Some(100),
            bounds: vec![Bounds::exact(2)],
            group_cap: None,
        };
        let first = solve(&problem, LONG).unwrap();
        assert_eq!(first.ids, vec![1, 2]);
        assert_eq!(solve(&problem, LONG).unwrap(), first);
    }

    #[test]
    fn equal_totals_prefer_lower_ids_over_a_single_star() {
        // {1, 2} and {3, 4} both score 8 within budget; 3 alone scores highest
        // and is explored first.
        let problem = Problem {
            items: vec![
                item(1, 0, 1, 50, 4.0),
                item(2, 0, 2, 50, 4.0),
                item(3, 0, 3, 60, 5.0),
                item(4, 0, 4, 40, 3.0),
            ],
            count: 2,
            budget: Some(100),
            bounds: vec![Bounds::exact(2)],
            group_cap: None,
        };
        let sol = solve(&problem, LONG).unwrap();
        assert_eq!(sol.ids, vec![1, 2]);
        assert!((sol.total_score - 8.0).abs() < 1e-9);
        assert!(sol.optimal);
    }

    #[test]
    fn budget_forces_cheaper_selection() {
        let problem = Problem {
            items: vec![
                item(1, 0, 1, 90, 10.0),
                item(2, 0, 2, 50, 6.0),
                item(3, 0, 3, 50, 5.0),
            ],
            count: 2,
            budget: Some(100),
            bounds: vec![Bounds::exact(2)],
            group_cap: None,
        };
        let sol = solve(&problem, LONG).unwrap();
        assert_eq!(sol.ids, vec![2, 3]);
        assert_eq!(sol.total_cost, 100);
        assert!((sol.total_score - 11.0).abs() < 1e-9);
    }

    #[test]
    fn group_cap_is_respected() {
        let problem = Problem {
            items: vec![
                item(1, 0, 7, 10, 9.0),
                item(2, 0, 7, 10, 8.0),
                item(3, 0, 7, 10, 7.0),
                item(4, 0, 8, 10, 1.0),
            ],
            count: 3,
            budget: None,
            bounds: vec![Bounds::exact(3)],
            group_cap: Some(2),
        };
        let sol = solve(&problem, LONG).unwrap();
        assert_eq!(sol.ids, vec![1, 2, 4]);
    }

    #[test]
    fn range_bounds_choose_best_mix() {
        // Category 0 exactly 1, category 1 between 1 and 3, pick 3.
        let problem = Problem {
            items: vec![
                item(1, 0, 1, 0, 2.0),
                item(2, 0, 2, 0, 9.0),
                item(3, 1, 3, 0, 4.0),
                item(4, 1, 4, 0, 3.0),
                item(5, 1, 5, 0, 1.0),
            ],
            count: 3,
            budget: None,
            bounds: vec![Bounds::exact(1), Bounds::range(1, 3)],
            group_cap: None,
        };
        let sol = solve(&problem, LONG).unwrap();
        assert_eq!(sol.ids, vec![2, 3, 4]);
    }

    #[test]
    fn infeasible_budget_is_an_error() {
        let problem = Problem {
            items: vec![item(1, 0, 1, 60, 1.0), item(2, 0, 2, 60, 1.0)],
            count: 2,
            budget: Some(100),
            bounds: vec![Bounds::exact(2)],
            group_cap: None,
        };
        match solve(&problem, LONG) {
            Err(EngineError::Infeasible(msg)) => assert!(msg.contains("costs 120")),
            other => panic!("expected Infeasible, got {other:?}"),
        }
    }

    #[test]
    fn infeasible_group_cap_is_an_error() {
        let problem = Problem {
            items: vec![item(1, 0, 1, 1, 1.0), item(2, 0, 1, 1, 1.0)],
            count: 2,
            budget: None,
            bounds: vec![Bounds::exact(2)],
            group_cap: Some(1),
        };
        assert!(matches!(solve(&problem, LONG), Err(EngineError::Infeasible(_))));
    }

    #[test]
    fn rejects_malformed_problems() {
        let bad_category = Problem {
            items: vec![item(1, 3, 1, 1, 1.0)],
            count: 1,
            budget: None,
            bounds: vec![Bounds::exact(1)],
            group_cap: None,
        };
        assert!(matches!(solve(&bad_category, LONG), Err(EngineError::InvalidInput(_))));

        let duplicate = Problem {
            items: vec![item(1, 0, 1, 1, 1.0), item(1, 0, 2, 1, 2.0)],
            count: 1,
            budget: None,
            bounds: vec![Bounds::exact(1)],
            group_cap: None,
        };
        assert!(matches!(solve(&duplicate, LONG), Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn presolve_drops_only_dominated_items() {
        // Five items in one category with max 2 and no group cap: an item
        // needs two dominators (earlier and no more expensive) to be dropped.
        let problem = Problem {
            items: vec![
                item(1, 0, 1, 10, 9.0),
                item(2, 0, 2, 10, 8.0),
                item(3, 0, 3, 10, 7.0),
                item(4, 0, 4, 5, 6.0),
                item(5, 0, 5, 20, 6.5),
            ],
            count: 2,
            budget: Some(100),
            bounds: vec![Bounds::exact(2)],
            group_cap: None,
        };
        let kept: Vec<PlayerId> = presolve(&problem).iter().map(|i| i.id).collect();
        // 3 and 5 are dominated by 1 and 2; 4 is cheaper than everything.
        assert_eq!(kept, vec![1, 2, 4]);
    }

    #[test]
    fn presolve_with_group_cap_counts_distinct_groups() {
        // max 1, cap 1, count 2 -> dominators must span 1 + 1 = 2 groups.
        let problem = Problem {
            items: vec![
                item(1, 0, 1, 10, 9.0),
                item(2, 0, 1, 10, 8.0),
                item(3, 0, 1, 10, 7.0),
                item(4, 1, 2, 10, 1.0),
            ],
            count: 2,
            budget: Some(100),
            bounds: vec![Bounds::exact(1), Bounds::exact(1)],
            group_cap: Some(1),
        };
        let kept: Vec<PlayerId> = presolve(&problem).iter().map(|i| i.id).collect();
        assert_eq!(kept, vec![1, 2, 3, 4]);
    }

    #[test]
    fn zero_time_budget_returns_best_effort() {
        // Score equals cost and every cost is even while the budget is odd,
        // so the bound stays at the budget, never meets the incumbent and the
        // search runs far past the first clock check. The first dive finds a
        // feasible selection well before that.
        let items: Vec<Item> = (0..40u32)
            .map(|i| item(i + 1, 0, i + 1, 40 + 2 * i, f64::from(40 + 2 * i)))
            .collect();
        let problem = Problem {
            items,
            count: 10,
            budget: Some(1001),
            bounds: vec![Bounds::exact(10)],
            group_cap: Some(1),
        };

        let sol = solve(&problem, Duration::ZERO).unwrap();
        assert!(!sol.optimal);
        assert!(sol.nodes >= TIME_CHECK_INTERVAL);
        assert_eq!(sol.ids.len(), 10);
        assert!(sol.ids.windows(2).all(|w| w[0] < w[1]));
        assert!(sol.total_cost <= 1001);
        assert!((sol.total_score - f64::from(sol.total_cost)).abs() < 1e-9);
    }
}
