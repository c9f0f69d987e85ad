use std::collections::{HashMap, HashSet};

/// Fixed curriculum priority: lower rank is recommended first.
#[derive(Debug, Clone)]
pub struct Curriculum {
    ranks: HashMap<String, usize>,
}

impl Default for Curriculum {
    fn default() -> Self {
        Self::new(["python_basics", "python_intermediate", "python_advanced"])
    }
}

impl Curriculum {
    /// Build a curriculum from competencies listed in priority order.
    /// A competency listed twice keeps its first rank.
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ranks = HashMap::new();
        for (rank, competency) in order.into_iter().enumerate() {
            ranks.entry(competency.into()).or_insert(rank);
        }
        Self { ranks }
    }

    pub fn rank(&self, competency: &str) -> Option<usize> {
        self.ranks.get(competency).copied()
    }

    /// Competencies not yet completed, in curriculum order. Unranked
    /// competencies follow the ranked ones in their input order.
    pub fn recommend<'a, I>(&self, all: I, completed: &HashSet<String>) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut pending: Vec<&String> = all
            .into_iter()
            .filter(|c| !completed.contains(*c))
            .collect();
        pending.sort_by_key(|c| self.rank(c).unwrap_or(usize::MAX));

        let mut seen = HashSet::new();
        pending
            .into_iter()
            .filter(|c| seen.insert(*c))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_mapped_before_unmapped() {
        let all = strings(&["x", "python_advanced", "python_basics"]);
        let recs = Curriculum::default().recommend(&all, &HashSet::new());
        assert_eq!(recs, strings(&["python_basics", "python_advanced", "x"]));
    }

    #[test]
    fn test_completed_excluded() {
        let all = strings(&["python_basics", "python_intermediate", "python_advanced"]);
        let completed: HashSet<String> = strings(&["python_basics"]).into_iter().collect();
        let recs = Curriculum::default().recommend(&all, &completed);
        assert_eq!(recs, strings(&["python_intermediate", "python_advanced"]));
    }

    #[test]
    fn test_unmapped_keep_input_order() {
        let all = strings(&["zeta", "alpha", "python_intermediate", "mid"]);
        let recs = Curriculum::default().recommend(&all, &HashSet::new());
        assert_eq!(recs, strings(&["python_intermediate", "zeta", "alpha", "mid"]));
    }

    #[test]
    fn test_custom_curriculum() {
        let curriculum = Curriculum::new(["loops", "functions", "loops"]);
        assert_eq!(curriculum.rank("loops"), Some(0));
        assert_eq!(curriculum.rank("functions"), Some(1));
        let all = strings(&["functions", "loops"]);
        assert_eq!(
            curriculum.recommend(&all, &HashSet::new()),
            strings(&["loops", "functions"])
        );
    }

    #[test]
    fn test_all_completed() {
        let all = strings(&["python_basics"]);
        let completed: HashSet<String> = all.iter().cloned().collect();
        assert!(Curriculum::default().recommend(&all, &completed).is_empty());
    }
}
