use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

use assess_core::model::{Category, Question};

/// Ordered questions drawn for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionQuestionSet {
    questions: Vec<Question>,
}

impl SessionQuestionSet {
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

/// Draws a category-balanced question set from a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionSetBuilder {
    target: usize,
}

impl Default for QuestionSetBuilder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TARGET)
    }
}

impl QuestionSetBuilder {
    pub const DEFAULT_TARGET: usize = 5;

    #[must_use]
    pub fn new(target: usize) -> Self {
        Self { target }
    }

    #[must_use]
    pub fn target(&self) -> usize {
        self.target
    }

    /// Select `min(target, catalog.len())` distinct questions.
    ///
    /// - Categories are visited in order of first appearance in the catalog.
    /// - Each category contributes up to `target / min(categories, target)` questions,
    ///   drawn uniformly at random, until the target is reached.
    /// - Any shortfall is backfilled uniformly from the questions not yet chosen.
    /// - The final order is shuffled.
    ///
    /// Questions sharing an id with an earlier catalog entry are ignored.
    pub fn build<R: Rng + ?Sized>(&self, catalog: &[Question], rng: &mut R) -> SessionQuestionSet {
        let mut seen = HashSet::new();
        let unique: Vec<&Question> = catalog.iter().filter(|q| seen.insert(q.id())).collect();
        if self.target == 0 || unique.is_empty() {
            return SessionQuestionSet::default();
        }

        let mut groups: Vec<(&Category, Vec<&Question>)> = Vec::new();
        for &question in &unique {
            match groups.iter_mut().find(|(c, _)| *c == question.category()) {
                Some((_, group)) => group.push(question),
                None => groups.push((question.category(), vec![question])),
            }
        }

        let per_category = (self.target / groups.len().min(self.target)).max(1);
        let mut selected: Vec<&Question> = Vec::with_capacity(self.target);
        for (_, group) in &mut groups {
            if selected.len() >= self.target {
                break;
            }
            group.shuffle(rng);
            let room = self.target - selected.len();
            selected.extend(group.iter().take(per_category.min(room)).copied());
        }

        if selected.len() < self.target {
            let chosen: HashSet<_> = selected.iter().map(|q| q.id()).collect();
            let mut pool: Vec<&Question> = unique
                .iter()
                .copied()
                .filter(|q| !chosen.contains(&q.id()))
                .collect();
            pool.shuffle(rng);
            let room = self.target - selected.len();
            selected.extend(pool.into_iter().take(room));
        }

        selected.shuffle(rng);
        SessionQuestionSet {
            questions: selected.into_iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::model::{AgeBand, QuestionId};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn question(id: u32, category: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            Category::new(category).unwrap(),
            format!("question {id}"),
            vec!["a".into(), "b".into()],
            0,
            None,
        )
        .unwrap()
    }

    fn catalog(layout: &[(&str, u32)]) -> Vec<Question> {
        let mut next = 0;
        let mut out = Vec::new();
        for (category, count) in layout {
            for _ in 0..*count {
                next += 1;
                out.push(question(next, category));
            }
        }
        out
    }

    fn categories(set: &SessionQuestionSet) -> HashSet<String> {
        set.questions()
            .iter()
            .map(|q| q.category().as_str().to_owned())
            .collect()
    }

    #[test]
    fn picks_distinct_questions_up_to_target() {
        let pool = catalog(&[("math", 4), ("memory", 4), ("logic", 4)]);
        for seed in 0..50 {
            let set = QuestionSetBuilder::new(5).build(&pool, &mut StdRng::seed_from_u64(seed));
            assert_eq!(set.len(), 5);
            let ids: HashSet<_> = set.questions().iter().map(Question::id).collect();
            assert_eq!(ids.len(), 5, "seed {seed}");
        }
    }

    #[test]
    fn every_category_is_represented_when_target_allows() {
        let pool = catalog(&[("math", 4), ("memory", 4), ("logic", 4)]);
        for seed in 0..50 {
            let set = QuestionSetBuilder::new(5).build(&pool, &mut StdRng::seed_from_u64(seed));
            assert_eq!(categories(&set).len(), 3, "seed {seed}");
        }
    }

    #[test]
    fn sparse_category_is_always_included() {
        let pool = catalog(&[("rare", 1), ("common", 6)]);
        for seed in 0..50 {
            let set = QuestionSetBuilder::new(5).build(&pool, &mut StdRng::seed_from_u64(seed));
            assert_eq!(set.len(), 5);
            assert!(categories(&set).contains("rare"), "seed {seed}");
        }
    }

    #[test]
    fn more_categories_than_target_takes_one_from_the_first() {
        let pool = catalog(&[("a", 2), ("b", 2), ("c", 2), ("d", 2)]);
        let set = QuestionSetBuilder::new(3).build(&pool, &mut StdRng::seed_from_u64(3));
        assert_eq!(set.len(), 3);
        assert_eq!(categories(&set), HashSet::from(["a", "b", "c"].map(String::from)));
    }

    #[test]
    fn small_catalog_returns_everything() {
        let pool = catalog(&[("math", 2), ("memory", 1)]);
        let set = QuestionSetBuilder::new(5).build(&pool, &mut StdRng::seed_from_u64(1));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn empty_catalog_or_zero_target_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(QuestionSetBuilder::new(5).build(&[], &mut rng).is_empty());
        let pool = catalog(&[("math", 2)]);
        assert!(QuestionSetBuilder::new(0).build(&pool, &mut rng).is_empty());
    }

    #[test]
    fn duplicate_ids_are_not_selected_twice() {
        let mut pool = catalog(&[("math", 3)]);
        pool.push(question(1, "memory"));
        let set = QuestionSetBuilder::new(5).build(&pool, &mut StdRng::seed_from_u64(9));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn same_seed_gives_same_order() {
        let pool = AgeBand::Adult.catalog().unwrap();
        let builder = QuestionSetBuilder::default();
        let a = builder.build(&pool, &mut StdRng::seed_from_u64(42));
        let b = builder.build(&pool, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn order_varies_across_seeds() {
        let pool = catalog(&[("math", 5), ("memory", 5)]);
        let builder = QuestionSetBuilder::new(5);
        let firsts: HashSet<_> = (0..40)
            .map(|seed| builder.build(&pool, &mut StdRng::seed_from_u64(seed)))
            .filter_map(|set| set.questions().first().map(Question::id))
            .collect();
        assert!(firsts.len() > 1);
    }
}
