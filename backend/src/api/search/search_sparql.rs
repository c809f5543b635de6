//! SPARQL builder for faceted campaign searches.
//!
//! A search compiles to two queries sharing one restriction body: the results
//! query pages over distinct campaign subjects in an inner subquery and joins
//! the requested facets back in the outer query, the count query counts the
//! same subjects without paging. Facet columns are joined with OPTIONAL so the
//! outer query never drops a subject the count query counted.

use common::{
    facet_catalog::{
        BASE_PATTERN, FilterCategory, LOCATION_PATTERN, LOCATION_VARIABLE, MULTI_VALUE_SEPARATOR, MatchKind,
        SPARQL_PREFIXES, TOP_LEVEL_VARIABLE, spec_for,
    },
    search_query::{Filters, Pagination},
};

/// Column under which the count query reports its single value.
pub const COUNT_COLUMN: &str = "count";

/// Column under which an option-list query reports each value.
pub const OPTION_COLUMN: &str = "v";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSearch {
    pub results_query: String,
    pub count_query: String,
    /// Requested columns without repeats, in catalog order.
    pub result_columns: Vec<FilterCategory>,
}

/// Triple lines kept unique, in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PatternSet {
    lines: Vec<&'static str>,
}

impl PatternSet {
    fn insert(&mut self, line: &'static str) {
        if !self.lines.contains(&line) {
            self.lines.push(line);
        }
    }

    fn extend(&mut self, lines: &[&'static str]) {
        for line in lines {
            self.insert(line);
        }
    }
}

/// Patterns and FILTER clauses restricting the set of matching subjects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Restriction {
    patterns: PatternSet,
    clauses: Vec<String>,
}

impl Restriction {
    pub(crate) fn from_filters(filters: &Filters) -> Self {
        let mut patterns = PatternSet::default();
        patterns.insert(BASE_PATTERN);
        // Rows are grouped by location, so a campaign without one is never a result.
        patterns.insert(LOCATION_PATTERN);
        let mut clauses = Vec::new();
        for (category, values) in filters.active() {
            patterns.extend(spec_for(category).patterns);
            clauses.push(filter_clause(category, values));
        }
        Self { patterns, clauses }
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.patterns
            .lines
            .iter()
            .map(|line| line.to_string())
            .chain(self.clauses.iter().cloned())
            .collect()
    }

    fn render(&self, indent: &str) -> String {
        self.lines().iter().map(|line| format!("{indent}{line}")).collect::<Vec<_>>().join("\n")
    }
}

/// Quotes a value as a SPARQL double-quoted string literal.
pub fn quote_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

/// One FILTER for a category: its values OR-combined.
fn filter_clause(category: FilterCategory, values: &[String]) -> String {
    let spec = spec_for(category);
    let variable = spec.variable;
    let terms = values
        .iter()
        .map(|value| match spec.match_kind {
            MatchKind::Exact => format!("?{variable} = {}", quote_literal(value)),
            MatchKind::Contains => format!("CONTAINS(?{variable}, {})", quote_literal(value)),
        })
        .collect::<Vec<_>>();
    format!("FILTER ({})", terms.join(" || "))
}

fn projection(category: FilterCategory) -> String {
    let spec = spec_for(category);
    if spec.is_group_key {
        format!("?{}", spec.variable)
    } else {
        format!(
            "(GROUP_CONCAT(DISTINCT ?{var}; separator=\"{MULTI_VALUE_SEPARATOR}\") AS ?{column})",
            var = spec.variable,
            column = spec.result_column(),
        )
    }
}

/// OPTIONAL joins for the requested columns. Columns reached through the same
/// link share one block so the link is joined once.
fn column_joins(columns: &[FilterCategory]) -> Vec<String> {
    let mut groups: Vec<(&'static [&'static str], PatternSet)> = Vec::new();
    for category in columns {
        let Some((leaf, link)) = spec_for(*category).patterns.split_last() else {
            continue;
        };
        match groups.iter_mut().find(|(known, _)| *known == link) {
            Some((_, leaves)) => leaves.insert(*leaf),
            None => {
                let mut leaves = PatternSet::default();
                leaves.insert(*leaf);
                groups.push((link, leaves));
            }
        }
    }

    let mut lines = Vec::new();
    for (link, leaves) in groups {
        if link.is_empty() {
            lines.extend(leaves.lines.iter().map(|leaf| format!("OPTIONAL {{ {leaf} }}")));
            continue;
        }
        lines.push("OPTIONAL {".to_string());
        lines.extend(link.iter().map(|line| format!("  {line}")));
        match leaves.lines.as_slice() {
            [only] => lines.push(format!("  {only}")),
            many => lines.extend(many.iter().map(|leaf| format!("  OPTIONAL {{ {leaf} }}"))),
        }
        lines.push("}".to_string());
    }
    lines
}

pub fn compile_search(
    filters: &Filters,
    output_columns: &[FilterCategory],
    pagination: Pagination,
) -> CompiledSearch {
    let mut result_columns = output_columns.to_vec();
    result_columns.sort();
    result_columns.dedup();

    let restriction = Restriction::from_filters(filters);

    let mut select = vec![format!("?{TOP_LEVEL_VARIABLE}"), format!("?{LOCATION_VARIABLE}")];
    let mut group_by = select.clone();
    for category in &result_columns {
        let spec = spec_for(*category);
        select.push(projection(*category));
        if spec.is_group_key {
            group_by.push(format!("?{}", spec.variable));
        }
    }
    let outer_lines = std::iter::once(LOCATION_PATTERN.to_string())
        .chain(column_joins(&result_columns))
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n");

    let s = TOP_LEVEL_VARIABLE;
    let results_query = format!(
        "{SPARQL_PREFIXES}
SELECT {select}
WHERE {{
  {{
    SELECT DISTINCT ?{s}
    WHERE {{
{inner}
    }}
    ORDER BY ASC(?{s})
    LIMIT {limit} OFFSET {offset}
  }}
{outer_lines}
}}
GROUP BY {group_by}
ORDER BY ASC(?{s})",
        select = select.join(" "),
        inner = restriction.render("      "),
        limit = pagination.limit,
        offset = pagination.offset,
        group_by = group_by.join(" "),
    );

    let count_query = format!(
        "{SPARQL_PREFIXES}
SELECT (COUNT(DISTINCT ?{s}) AS ?{COUNT_COLUMN})
WHERE {{
{inner}
}}",
        inner = restriction.render("  "),
    );

    CompiledSearch { results_query, count_query, result_columns }
}

/// Distinct values of one facet across all campaigns, for the search form.
pub fn facet_options_query(category: FilterCategory) -> String {
    let spec = spec_for(category);
    let mut patterns = PatternSet::default();
    patterns.insert(BASE_PATTERN);
    patterns.extend(spec.patterns);
    let lines = patterns.lines.iter().map(|line| format!("  {line}")).collect::<Vec<_>>().join("\n");
    format!(
        "{SPARQL_PREFIXES}
SELECT DISTINCT (?{var} AS ?{OPTION_COLUMN})
WHERE {{
{lines}
}}
ORDER BY ASC(?{OPTION_COLUMN})",
        var = spec.variable,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caffeine() -> Filters {
        Filters::new().with(FilterCategory::CampaignName, ["Caffeine Synthesis"])
    }

    /// Trimmed lines between `start` (exclusive) and the first line equal to `end`.
    fn block(query: &str, start: &str, end: &str) -> Vec<String> {
        query
            .lines()
            .map(str::trim)
            .skip_while(|line| *line != start)
            .skip(1)
            .take_while(|line| *line != end)
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn results_and_count_share_the_restriction() {
        let filters = caffeine().with(FilterCategory::Cas, ["100-42-5", "108-88-3"]);
        let compiled =
            compile_search(&filters, &[FilterCategory::CampaignName], Pagination::new(10, 20).unwrap());
        let expected = Restriction::from_filters(&filters).lines();

        let inner = block(&compiled.results_query, "SELECT DISTINCT ?s", "}");
        assert_eq!(inner[0], "WHERE {");
        assert_eq!(inner[1..], expected[..]);

        let count = block(&compiled.count_query, "WHERE {", "}");
        assert_eq!(count, expected);

        assert!(compiled.results_query.contains("LIMIT 10 OFFSET 20"));
        assert!(!compiled.count_query.contains("LIMIT"));
        assert!(!compiled.count_query.contains("OFFSET"));
    }

    #[test]
    fn pagination_applies_only_to_the_inner_subquery() {
        let compiled = compile_search(
            &caffeine(),
            &[FilterCategory::CampaignName, FilterCategory::ReactionName],
            Pagination::new(5, 0).unwrap(),
        );
        assert_eq!(compiled.results_query.matches("LIMIT").count(), 1);
        let after_subquery = compiled.results_query.split("LIMIT 5 OFFSET 0").nth(1).unwrap();
        assert!(!after_subquery.contains("LIMIT"));
        assert!(after_subquery.contains("GROUP BY ?s ?cu ?cp ?rn"));
        assert!(compiled.results_query.trim_end().ends_with("ORDER BY ASC(?s)"));

        for query in [&compiled.results_query, &compiled.count_query] {
            assert!(query.contains("?s schema:name ?cp ."));
            assert!(query.contains("FILTER (CONTAINS(?cp, \"Caffeine Synthesis\"))"));
        }
        assert_eq!(compiled.result_columns, vec![FilterCategory::CampaignName, FilterCategory::ReactionName]);
    }

    #[test]
    fn shared_patterns_appear_once() {
        let compiled = compile_search(
            &Filters::new(),
            &[FilterCategory::Smiles, FilterCategory::Cas, FilterCategory::ChemicalName, FilterCategory::Cas],
            Pagination::default(),
        );
        assert_eq!(compiled.results_query.matches("?s cat:hasChemical ?c .").count(), 1);
        assert_eq!(
            compiled.result_columns,
            vec![FilterCategory::ChemicalName, FilterCategory::Cas, FilterCategory::Smiles]
        );
        assert!(compiled.results_query.contains("  OPTIONAL { ?c cat:casNumber ?ca . }"));
        assert!(compiled.results_query.contains("(GROUP_CONCAT(DISTINCT ?ca; separator=\" | \") AS ?ca_list)"));
        assert!(compiled.results_query.contains("GROUP BY ?s ?cu\n"));
    }

    #[test]
    fn values_of_one_category_are_or_combined_and_categories_and_combined() {
        let filters = Filters::new()
            .with(FilterCategory::Cas, ["100-42-5", "108-88-3"])
            .with(FilterCategory::ReactionType, ["N-methylation"]);
        let compiled = compile_search(&filters, &[], Pagination::default());
        assert!(compiled.count_query.contains("FILTER (?ca = \"100-42-5\" || ?ca = \"108-88-3\")"));
        assert!(compiled.count_query.contains("FILTER (CONTAINS(?rt, \"N-methylation\"))"));
        assert_eq!(compiled.count_query.matches("FILTER").count(), 2);
    }

    #[test]
    fn empty_filters_restrict_only_on_the_base_pattern() {
        let compiled = compile_search(&Filters::new(), &[], Pagination::default());
        assert_eq!(
            block(&compiled.count_query, "WHERE {", "}"),
            vec![BASE_PATTERN.to_string(), LOCATION_PATTERN.to_string()]
        );
        assert!(!compiled.results_query.contains("FILTER"));
        assert!(compiled.results_query.contains("SELECT ?s ?cu\n"));
    }

    /// Trimmed lines of the outer WHERE body, after the paginated subquery.
    fn outer_body(query: &str) -> Vec<String> {
        let mut lines = query
            .lines()
            .map(str::trim)
            .skip_while(|line| !line.starts_with("LIMIT"))
            .skip(2)
            .take_while(|line| !line.starts_with("GROUP BY"))
            .map(str::to_string)
            .collect::<Vec<_>>();
        lines.pop();
        lines
    }

    #[test]
    fn outer_joins_never_narrow_the_counted_subjects() {
        let filters = caffeine().with(FilterCategory::Cas, ["58-08-2"]);
        for columns in [
            FilterCategory::all_categories().to_vec(),
            vec![FilterCategory::DeviceType],
            vec![FilterCategory::Smiles, FilterCategory::ReactionName],
        ] {
            for filters in [Filters::new(), filters.clone()] {
                let compiled = compile_search(&filters, &columns, Pagination::default());
                let counted = block(&compiled.count_query, "WHERE {", "}");
                let outer = outer_body(&compiled.results_query);
                assert!(!outer.is_empty());

                let mut depth = 0usize;
                for line in &outer {
                    if line == "OPTIONAL {" {
                        depth += 1;
                    } else if line == "}" {
                        depth -= 1;
                    } else if !line.starts_with("OPTIONAL {") && depth == 0 {
                        assert!(counted.contains(line), "required outer pattern {line:?} is not counted");
                    }
                }
                assert_eq!(depth, 0);
            }
        }
    }

    #[test]
    fn columns_behind_one_link_share_an_optional_block() {
        let compiled =
            compile_search(&Filters::new(), &[FilterCategory::Cas, FilterCategory::Smiles], Pagination::default());
        let outer = outer_body(&compiled.results_query);
        assert_eq!(
            outer,
            vec![
                LOCATION_PATTERN,
                "OPTIONAL {",
                "?s cat:hasChemical ?c .",
                "OPTIONAL { ?c cat:casNumber ?ca . }",
                "OPTIONAL { ?c allores:AFR_0002295 ?sm . }",
                "}",
            ]
        );

        let compiled = compile_search(&Filters::new(), &[FilterCategory::CampaignName], Pagination::default());
        assert_eq!(outer_body(&compiled.results_query), vec![LOCATION_PATTERN, "OPTIONAL { ?s schema:name ?cp . }"]);
    }

    #[test]
    fn values_are_escaped() {
        assert_eq!(quote_literal("plain"), "\"plain\"");
        assert_eq!(quote_literal("a\"b\\c\nd"), "\"a\\\"b\\\\c\\nd\"");
        let filters = Filters::new().with(FilterCategory::Smiles, ["\" } ; DROP"]);
        let compiled = compile_search(&filters, &[], Pagination::default());
        assert!(compiled.count_query.contains("?sm = \"\\\" } ; DROP\""));
    }

    #[test]
    fn compilation_is_deterministic() {
        let filters = caffeine().with(FilterCategory::DeviceType, ["Agilent"]);
        let columns = [FilterCategory::DeviceType, FilterCategory::CampaignName];
        assert_eq!(
            compile_search(&filters, &columns, Pagination::default()),
            compile_search(&filters, &columns, Pagination::default())
        );
    }

    #[test]
    fn option_query_lists_distinct_values() {
        let query = facet_options_query(FilterCategory::DeviceType);
        assert!(query.contains("SELECT DISTINCT (?dt AS ?v)"));
        assert!(query.contains(BASE_PATTERN));
        assert!(query.contains("?s allores:AFR_0002526 ?dsd ."));
        assert!(query.ends_with("ORDER BY ASC(?v)"));
    }
}
