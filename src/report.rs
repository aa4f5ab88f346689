use owo_colors::OwoColorize;

/// Number of videos accounted for one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassCount {
    pub class_id: u32,
    pub class: String,
    pub count: usize,
}

/// Print an aligned per-class summary table.
///
/// The summary is part of the tool contract rather than logging,
/// so it goes to stdout unconditionally.
pub fn print_class_counts(title: &str, counts: &[ClassCount]) {
    let class_width = counts
        .iter()
        .map(|c| c.class.len())
        .chain(std::iter::once("class".len()))
        .max()
        .unwrap_or(0);

    println!("{}", format!("===== {title} =====").bold());
    println!("{:>8}  {:<class_width$}  {:>6}", "class_id", "class", "count");
    for c in counts {
        println!("{:>8}  {:<class_width$}  {:>6}", c.class_id, c.class, c.count);
    }
}

/// Sum of the per-class counts
pub fn total(counts: &[ClassCount]) -> usize {
    counts.iter().map(|c| c.count).sum()
}

#[cfg(test)]
mod tests {
    use super::{total, ClassCount};

    #[test]
    fn total_sums_all_classes() {
        let counts = [
            ClassCount {
                class_id: 0,
                class: "cat".to_string(),
                count: 2,
            },
            ClassCount {
                class_id: 1,
                class: "dog".to_string(),
                count: 1,
            },
        ];
        assert_eq!(total(&counts), 3);
    }
}
