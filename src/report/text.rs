use std::fmt::Write;

use crate::model::ScoredEntity;
use crate::overlap::OverlapPartition;
use crate::pipeline::{OverlapOutcome, SiteComparison};
use crate::report::format_f64_6;
use crate::stats::significance::PairDecision;

/// URL for the external chart service that renders a 2- or 3-circle
/// diagram from the set labels and region sizes. The service draws the
/// image; this crate only emits the URL string.
pub fn venn_diagram_url(partition: &OverlapPartition) -> String {
    let sizes = &partition.set_sizes;
    let pairs = &partition.pair_sizes;
    let data = if partition.is_three_way() {
        format!(
            "{},{},{},{},{},{},{}",
            sizes[0],
            sizes[1],
            sizes[2],
            pairs[0],
            pairs[1],
            pairs[2],
            partition.all.len()
        )
    } else {
        format!("{},{},0,{},0,0,0", sizes[0], sizes[1], pairs[0])
    };
    let labels: Vec<String> = partition.names.iter().map(|n| encode_component(n)).collect();
    format!(
        "https://chart.googleapis.com/chart?cht=v&chs=650x350&chco=FF6342,ADDE63,63C6DE&chd=t:{}&chdl={}",
        data,
        labels.join("|")
    )
}

fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            ' ' => out.push('+'),
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => out.push(ch),
            other => {
                let mut buf = [0u8; 4];
                for byte in other.encode_utf8(&mut buf).bytes() {
                    let _ = write!(out, "%{byte:02X}");
                }
            }
        }
    }
    out
}

pub fn render_overlap_report(outcome: &OverlapOutcome, unix_timestamp: u64) -> String {
    let partition = &outcome.partition;
    let mut out = String::new();

    let quoted: Vec<String> = partition.names.iter().map(|n| format!("'{n}'")).collect();
    let _ = writeln!(out, "Comparing {}", quoted.join(" vs "));
    out.push_str("###############\n");
    let _ = writeln!(out, "Comparison made on: {unix_timestamp} (seconds since epoch)");
    out.push_str("Datasets compared:\n");
    for (name, file) in &outcome.dataset_files {
        let _ = writeln!(out, "{name}\t{}", file.display());
    }
    out.push('\n');

    out.push_str(
        "Venn diagram URL (copy and paste the following URL in a browser to get the diagram):\n",
    );
    let _ = writeln!(out, "{}", venn_diagram_url(partition));
    out.push('\n');

    out.push_str("Overlap summary:\n");
    for (name, size) in partition.names.iter().zip(&partition.set_sizes) {
        let _ = writeln!(out, "{name} ({size})");
    }
    if partition.is_three_way() {
        let _ = writeln!(
            out,
            "{} AND {} ({})",
            partition.names[0], partition.names[1], partition.pair_sizes[0]
        );
        let _ = writeln!(
            out,
            "{} AND {} ({})",
            partition.names[0], partition.names[2], partition.pair_sizes[1]
        );
        let _ = writeln!(
            out,
            "{} AND {} ({})",
            partition.names[1], partition.names[2], partition.pair_sizes[2]
        );
    }
    let _ = writeln!(
        out,
        "{} ({})",
        partition.names.join(" AND "),
        partition.all.len()
    );
    out.push('\n');

    let _ = writeln!(
        out,
        "The following lists correspond to the overlap regions, printing the {} key and the FDR value:",
        match outcome.kind {
            crate::input::KeyLayout::Peptide => "peptide",
            crate::input::KeyLayout::Protein => "protein",
        }
    );
    out.push('\n');

    region(&mut out, &format!("Intersection ({})", partition.all.len()), &partition.all);
    if let (Some(ab), Some(ac), Some(bc)) =
        (&partition.ab_only, &partition.ac_only, &partition.bc_only)
    {
        region(
            &mut out,
            &format!("Only in {} AND {} ({})", partition.names[0], partition.names[1], ab.len()),
            ab,
        );
        region(
            &mut out,
            &format!("Only in {} AND {} ({})", partition.names[0], partition.names[2], ac.len()),
            ac,
        );
        region(
            &mut out,
            &format!("Only in {} AND {} ({})", partition.names[1], partition.names[2], bc.len()),
            bc,
        );
    }
    region(
        &mut out,
        &format!("Unique to: {} ({})", partition.names[0], partition.only_a.len()),
        &partition.only_a,
    );
    region(
        &mut out,
        &format!("Unique to: {} ({})", partition.names[1], partition.only_b.len()),
        &partition.only_b,
    );
    if let Some(only_c) = &partition.only_c {
        region(
            &mut out,
            &format!("Unique to: {} ({})", partition.names[2], only_c.len()),
            only_c,
        );
    }

    out
}

fn region(out: &mut String, heading: &str, entities: &[ScoredEntity]) {
    let _ = writeln!(out, "{heading}:");
    for (i, entity) in entities.iter().enumerate() {
        let _ = writeln!(out, "{}\t{}\t{}", i + 1, entity.key, entity.fdr);
    }
    out.push('\n');
}

/// Tabular per-site report: one row per retained site, ratio columns per
/// dataset and p/q/flag columns per dataset pair. Infinity-rule cells have
/// no numeric p-value; their p column stays empty while the q column shows
/// the corrected surrogate.
pub fn render_site_report(comparison: &SiteComparison) -> String {
    let mut out = String::new();
    let labels = &comparison.labels;

    let _ = writeln!(
        out,
        "Quantified site comparison: {}",
        labels.join(" vs ")
    );
    let _ = writeln!(
        out,
        "Correction method: {} ({})",
        comparison.config.correction,
        comparison.config.correction.reference()
    );
    let _ = writeln!(out, "q-value threshold: {}", comparison.config.qvalue_threshold);
    let _ = writeln!(
        out,
        "Number of sigmas for infinite ratios: {}",
        comparison.config.number_sigmas
    );
    let _ = writeln!(
        out,
        "Minimum discoveries per site: {}",
        comparison.config.min_discoveries
    );
    let _ = writeln!(
        out,
        "Background ratio distribution: mean={}, sigma={} ({} finite ratios)",
        format_f64_6(comparison.background.mean),
        format_f64_6(comparison.background.sigma),
        comparison.background.n_finite
    );
    let _ = writeln!(
        out,
        "Sites compared: {}; sites reported: {}",
        comparison.n_sites_total,
        comparison.rows.len()
    );
    out.push('\n');

    // header
    out.push_str("site");
    for label in labels {
        let _ = write!(out, "\tratio_{label}");
    }
    for &(i, j) in &comparison.pairs {
        let _ = write!(
            out,
            "\tp_{a}_vs_{b}\tq_{a}_vs_{b}\tsignificant_{a}_vs_{b}",
            a = labels[i],
            b = labels[j]
        );
    }
    out.push_str("\tdiscoveries\n");

    for row in &comparison.rows {
        out.push_str(row.key.joined());
        for ratio in &row.ratios {
            match ratio {
                Some(r) => {
                    let _ = write!(out, "\t{}", r.display_value(comparison.config.r_inf));
                }
                None => out.push('\t'),
            }
        }
        for cell in &row.cells {
            match cell {
                Some(cell) => {
                    match cell.decision {
                        PairDecision::Finite { p_value, .. } => {
                            let _ = write!(out, "\t{}", format_f64_6(p_value));
                        }
                        PairDecision::InfinityRule { .. } => out.push('\t'),
                    }
                    let _ = write!(out, "\t{}", format_f64_6(cell.qvalue));
                    let discovery = crate::stats::correction::is_discovery(
                        cell.qvalue,
                        comparison.config.qvalue_threshold,
                    );
                    let _ = write!(out, "\t{}", if discovery { "1" } else { "0" });
                }
                None => out.push_str("\t\t\t"),
            }
        }
        let _ = writeln!(out, "\t{}", row.discoveries);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::{DEFAULT_NUMBER_SIGMAS, DEFAULT_QVALUE_THRESHOLD};
    use crate::model::{
        CorrectionMethod, EntityKey, NamedEntitySet, PlexType, Ratio, SiteCompareConfig,
    };
    use crate::overlap::compute_overlap;
    use crate::pipeline::{PairCell, SiteRow};
    use crate::stats::RatioBackground;
    use std::collections::HashSet;
    use std::path::PathBuf;

    fn entity(key: &str) -> ScoredEntity {
        ScoredEntity {
            key: EntityKey::parse(key, "_"),
            fdr: 0.01,
            ratio: Ratio::Finite(1.0),
            variance: 0.1,
            evidence_count: 2,
        }
    }

    fn outcome() -> OverlapOutcome {
        let a = NamedEntitySet::new(
            "one",
            ["PEP1", "PEP2", "PEP3"].iter().map(|k| entity(k)).collect::<HashSet<_>>(),
        );
        let b = NamedEntitySet::new(
            "two",
            ["PEP2", "PEP3", "PEP4"].iter().map(|k| entity(k)).collect::<HashSet<_>>(),
        );
        OverlapOutcome {
            title: "one vs two".to_string(),
            kind: crate::input::KeyLayout::Peptide,
            dataset_files: vec![
                ("one".to_string(), PathBuf::from("/data/one.tsv")),
                ("two".to_string(), PathBuf::from("/data/two.tsv")),
            ],
            partition: compute_overlap(&a, &b, None),
        }
    }

    #[test]
    fn test_overlap_report_contains_regions_and_url() {
        let report = render_overlap_report(&outcome(), 1_700_000_000);
        assert!(report.contains("Comparing 'one' vs 'two'"));
        assert!(report.contains("https://chart.googleapis.com/chart?cht=v"));
        assert!(report.contains("Intersection (2):"));
        assert!(report.contains("Unique to: one (1):"));
        assert!(report.contains("1\tPEP1\t0.01"));
    }

    #[test]
    fn test_venn_url_two_way_sizes() {
        let url = venn_diagram_url(&outcome().partition);
        assert!(url.contains("chd=t:3,3,0,2,0,0,0"));
        assert!(url.contains("chdl=one|two"));
    }

    #[test]
    fn test_encode_component_escapes() {
        assert_eq!(encode_component("exp 1"), "exp+1");
        assert_eq!(encode_component("a/b"), "a%2Fb");
        assert_eq!(encode_component("plain-name_1.2"), "plain-name_1.2");
    }

    fn site_comparison() -> SiteComparison {
        SiteComparison {
            labels: vec!["a".to_string(), "b".to_string()],
            pairs: vec![(0, 1)],
            background: RatioBackground {
                mean: 1.0,
                sigma: 0.2,
                n_finite: 40,
            },
            n_sites_total: 5,
            rows: vec![SiteRow {
                key: EntityKey::parse("SITE1", "_"),
                ratios: vec![Some(Ratio::PositiveInfinite), Some(Ratio::Finite(1.2))],
                cells: vec![Some(PairCell {
                    decision: PairDecision::InfinityRule { significant: true },
                    qvalue: 0.0,
                })],
                discoveries: 1,
            }],
            config: SiteCompareConfig {
                fdr_threshold: 1.0,
                r_inf: Some(1000.0),
                plex: PlexType::TenPlex,
                correction: CorrectionMethod::BenjaminiHochberg,
                qvalue_threshold: DEFAULT_QVALUE_THRESHOLD,
                number_sigmas: DEFAULT_NUMBER_SIGMAS,
                min_discoveries: 0,
            },
        }
    }

    #[test]
    fn test_site_report_applies_rinf_substitution() {
        let report = render_site_report(&site_comparison());
        // +Infinity printed as the configured replacement value
        assert!(report.contains("SITE1\t1000\t1.2"));
    }

    #[test]
    fn test_site_report_infinity_cell_has_empty_p_column() {
        let report = render_site_report(&site_comparison());
        let row = report.lines().find(|l| l.starts_with("SITE1")).unwrap();
        let fields: Vec<&str> = row.split('\t').collect();
        // site, ratio_a, ratio_b, p, q, significant, discoveries
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[3], "", "no numeric p for an infinity-rule cell");
        assert_eq!(fields[4], "0.000000");
        assert_eq!(fields[5], "1");
        assert_eq!(fields[6], "1");
    }

    #[test]
    fn test_site_report_header_names_pairs() {
        let report = render_site_report(&site_comparison());
        assert!(report.contains("p_a_vs_b\tq_a_vs_b\tsignificant_a_vs_b\tdiscoveries"));
    }
}
