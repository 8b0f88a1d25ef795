//! Snippet catalog: built-in teaching snippets plus optional JSON
//! catalog files.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use rand::Rng;
use serde::Deserialize;

use crate::config::Config;

/// One runnable source snippet with a human-readable title.
#[derive(Debug, Clone, Deserialize)]
pub struct Snippet {
    pub title: String,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    snippets: Vec<Snippet>,
}

impl Catalog {
    /// The built-in catalog of small teaching snippets.
    pub fn builtin() -> Self {
        Self {
            snippets: builtin_snippets(),
        }
    }

    /// Load a catalog from a JSON file of `[{"title", "source"}]` entries.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading catalog {}", path.display()))?;
        let snippets: Vec<Snippet> = serde_json::from_str(&text)
            .with_context(|| format!("parsing catalog {}", path.display()))?;
        if snippets.is_empty() {
            bail!("catalog {} contains no snippets", path.display());
        }
        Ok(Self { snippets })
    }

    /// Resolve the catalog: `PYPAD_CATALOG` when configured, otherwise
    /// the built-in set.
    pub fn load(cfg: &Config) -> Result<Self> {
        match cfg.get_path("PYPAD_CATALOG") {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Snippet> {
        self.snippets.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snippet> {
        self.snippets.iter()
    }

    /// Pick a snippet index uniformly at random.
    pub fn pick_random(&self) -> Option<usize> {
        if self.snippets.is_empty() {
            return None;
        }
        Some(rand::thread_rng().gen_range(0..self.snippets.len()))
    }

    /// Pick a random index different from `current`, when one exists.
    /// With no current snippet this is a plain random pick.
    pub fn pick_different(&self, current: Option<usize>) -> Option<usize> {
        let Some(current) = current else {
            return self.pick_random();
        };
        if current >= self.snippets.len() {
            return self.pick_random();
        }
        if self.snippets.len() < 2 {
            return None;
        }
        // Uniform over the other indices: draw from a range one short
        // and skip over `current`.
        let mut index = rand::thread_rng().gen_range(0..self.snippets.len() - 1);
        if index >= current {
            index += 1;
        }
        Some(index)
    }
}

fn builtin_snippets() -> Vec<Snippet> {
    let entries: &[(&str, &str)] = &[
        (
            "Hello, world",
            r#"print("Hello, world!")
"#,
        ),
        (
            "Fibonacci numbers",
            r#"def fibonacci(n):
    sequence = [0, 1]
    while len(sequence) < n:
        sequence.append(sequence[-1] + sequence[-2])
    return sequence[:n]

print(fibonacci(10))
"#,
        ),
        (
            "Binary search",
            r#"def binary_search(items, target):
    low, high = 0, len(items) - 1
    while low <= high:
        mid = (low + high) // 2
        if items[mid] == target:
            return mid
        if items[mid] < target:
            low = mid + 1
        else:
            high = mid - 1
    return -1

primes = [2, 3, 5, 7, 11, 13, 17, 19]
print(binary_search(primes, 11))
print(binary_search(primes, 4))
"#,
        ),
        (
            "Stack basics",
            r#"stack = []
for value in ["a", "b", "c"]:
    stack.append(value)
    print("pushed", value)

while stack:
    print("popped", stack.pop())
"#,
        ),
        (
            "Bubble sort",
            r#"def bubble_sort(items):
    items = list(items)
    for end in range(len(items) - 1, 0, -1):
        for i in range(end):
            if items[i] > items[i + 1]:
                items[i], items[i + 1] = items[i + 1], items[i]
    return items

print(bubble_sort([5, 1, 4, 2, 8]))
"#,
        ),
        (
            "Queue with deque",
            r#"from collections import deque

queue = deque()
for job in ["build", "test", "deploy"]:
    queue.append(job)

while queue:
    print("running", queue.popleft())
"#,
        ),
    ];

    entries
        .iter()
        .map(|(title, source)| Snippet {
            title: (*title).to_string(),
            source: (*source).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_catalog_is_usable() {
        let catalog = Catalog::builtin();
        assert!(catalog.len() >= 2);
        for snippet in catalog.iter() {
            assert!(!snippet.title.is_empty());
            assert!(!snippet.source.trim().is_empty());
        }
    }

    #[test]
    fn random_pick_is_in_range() {
        let catalog = Catalog::builtin();
        for _ in 0..50 {
            let index = catalog.pick_random().unwrap();
            assert!(index < catalog.len());
        }
    }

    #[test]
    fn different_pick_never_repeats_current() {
        let catalog = Catalog::builtin();
        for current in 0..catalog.len() {
            for _ in 0..50 {
                let picked = catalog.pick_different(Some(current)).unwrap();
                assert_ne!(picked, current);
                assert!(picked < catalog.len());
            }
        }
    }

    #[test]
    fn different_pick_without_current_is_random() {
        let catalog = Catalog::builtin();
        assert!(catalog.pick_different(None).is_some());
    }

    #[test]
    fn single_entry_catalog_has_no_different_pick() {
        let catalog = Catalog {
            snippets: vec![Snippet {
                title: "only".into(),
                source: "print(1)".into(),
            }],
        };
        assert_eq!(catalog.pick_different(Some(0)), None);
    }

    #[test]
    fn loads_catalog_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"title": "Squares", "source": "print([n * n for n in range(5)])"}}]"#
        )
        .unwrap();

        let catalog = Catalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(0).unwrap().title, "Squares");
    }

    #[test]
    fn rejects_malformed_catalog_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json at all").unwrap();
        assert!(Catalog::from_file(file.path()).is_err());
    }

    #[test]
    fn rejects_empty_catalog_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        assert!(Catalog::from_file(file.path()).is_err());
    }

    #[test]
    fn out_of_range_lookup_is_none() {
        assert!(Catalog::builtin().get(10_000).is_none());
    }
}
