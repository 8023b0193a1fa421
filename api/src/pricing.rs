//! Quotation pricing arithmetic.
//!
//! Everything here is pure: the handlers feed it the package lines of a
//! quotation and persist whatever comes back. Derived amounts submitted by a
//! client are recomputed before every write.

use entity::quotation::{PackagePrice, ServiceLine};
use serde::Serialize;

use crate::error::{ApiResult, validation};

/// Package names compare case-insensitively everywhere; the first-seen casing
/// is what gets displayed.
pub fn same_package(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

pub fn line_total(unit_price: i64, volume: f64) -> i64 {
    (unit_price as f64 * volume).round() as i64
}

pub fn set_unit_price(
    lines: &mut [ServiceLine],
    line_idx: usize,
    package_name: &str,
    price: i64,
) -> ApiResult<()> {
    if price < 0 {
        return Err(validation("unit price cannot be negative"));
    }
    let line = lines
        .get_mut(line_idx)
        .ok_or_else(|| validation("service line index out of range"))?;
    match line
        .packages
        .iter_mut()
        .find(|p| same_package(&p.package_name, package_name))
    {
        Some(pkg) => {
            pkg.unit_price = price;
            pkg.total_price = line_total(price, line.volume);
            pkg.is_selected = price > 0;
        }
        None => line.packages.push(PackagePrice {
            package_name: package_name.to_string(),
            unit_price: price,
            total_price: line_total(price, line.volume),
            is_selected: price > 0,
        }),
    }
    Ok(())
}

/// Manually setting a volume pins the line: later survey relinks leave it
/// alone.
pub fn set_volume(lines: &mut [ServiceLine], line_idx: usize, volume: f64) -> ApiResult<()> {
    if !volume.is_finite() || volume < 0.0 {
        return Err(validation("volume must be a non-negative number"));
    }
    let line = lines
        .get_mut(line_idx)
        .ok_or_else(|| validation("service line index out of range"))?;
    line.volume = volume;
    line.volume_pinned = true;
    for pkg in &mut line.packages {
        pkg.total_price = line_total(pkg.unit_price, volume);
    }
    Ok(())
}

/// Pushes the survey-derived volume into every unpinned line.
pub fn apply_survey_volume(lines: &mut [ServiceLine], total_volume: f64) {
    for line in lines.iter_mut().filter(|l| !l.volume_pinned) {
        line.volume = total_volume;
        for pkg in &mut line.packages {
            pkg.total_price = line_total(pkg.unit_price, line.volume);
        }
    }
}

/// Without a linked survey an unset volume falls back to 1.
pub fn default_volumes(lines: &mut [ServiceLine]) {
    for line in lines.iter_mut().filter(|l| !l.volume_pinned) {
        if line.volume <= 0.0 || !line.volume.is_finite() {
            line.volume = 1.0;
        }
    }
}

/// Recomputes every derived field from `unit_price` and `volume`; selection
/// follows the price, whatever the payload claimed.
pub fn recompute(lines: &mut [ServiceLine]) {
    for line in lines.iter_mut() {
        for pkg in &mut line.packages {
            pkg.total_price = line_total(pkg.unit_price, line.volume);
            pkg.is_selected = pkg.unit_price > 0;
        }
    }
}

/// Folds duplicate `(serviceGroup, service)` lines together and drops
/// duplicate package names within a line, first occurrence winning.
pub fn normalize_lines(lines: Vec<ServiceLine>) -> Vec<ServiceLine> {
    let mut out: Vec<ServiceLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match out.iter_mut().find(|existing| {
            same_package(&existing.service_group, &line.service_group)
                && same_package(&existing.service, &line.service)
        }) {
            Some(existing) => merge_packages(existing, line.packages),
            None => {
                let mut fresh = line;
                let packages = std::mem::take(&mut fresh.packages);
                merge_packages(&mut fresh, packages);
                out.push(fresh);
            }
        }
    }
    out
}

/// Merge-without-duplication: an incoming package whose name is already on
/// the line is skipped.
pub fn merge_packages(line: &mut ServiceLine, incoming: Vec<PackagePrice>) {
    for pkg in incoming {
        let duplicate = line
            .packages
            .iter()
            .any(|existing| same_package(&existing.package_name, &pkg.package_name));
        if !duplicate {
            line.packages.push(pkg);
        }
    }
}

pub fn total_amount(lines: &[ServiceLine]) -> i64 {
    lines
        .iter()
        .flat_map(|line| line.packages.iter())
        .filter(|pkg| pkg.is_selected)
        .map(|pkg| pkg.total_price)
        .sum()
}

pub fn grand_total(total_amount: i64, tax_amount: i64) -> i64 {
    total_amount + tax_amount
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageAggregate {
    pub package_name: String,
    pub total_price: i64,
}

/// Sums `total_price` per package name across every line, for the
/// side-by-side package comparison.
pub fn aggregate_by_package(lines: &[ServiceLine]) -> Vec<PackageAggregate> {
    let mut out: Vec<PackageAggregate> = Vec::new();
    for pkg in lines.iter().flat_map(|line| line.packages.iter()) {
        match out
            .iter_mut()
            .find(|agg| same_package(&agg.package_name, &pkg.package_name))
        {
            Some(agg) => agg.total_price += pkg.total_price,
            None => out.push(PackageAggregate {
                package_name: pkg.package_name.clone(),
                total_price: pkg.total_price,
            }),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(service: &str, volume: f64, packages: Vec<PackagePrice>) -> ServiceLine {
        ServiceLine {
            id: String::new(),
            service_group: "Thi công".into(),
            service: service.into(),
            volume,
            volume_pinned: false,
            packages,
        }
    }

    fn package(name: &str, unit_price: i64) -> PackagePrice {
        PackagePrice {
            package_name: name.into(),
            unit_price,
            total_price: 0,
            is_selected: false,
        }
    }

    #[test]
    fn set_unit_price_recomputes_total() {
        let mut lines = vec![line("Thiết kế nhà", 9.0, vec![])];
        set_unit_price(&mut lines, 0, "Premium", 250).unwrap();
        let pkg = &lines[0].packages[0];
        assert_eq!(pkg.total_price, 2250);
        assert!(pkg.is_selected);

        set_unit_price(&mut lines, 0, "premium", 0).unwrap();
        assert_eq!(lines[0].packages.len(), 1, "case-insensitive match, no new entry");
        assert_eq!(lines[0].packages[0].total_price, 0);
        assert!(!lines[0].packages[0].is_selected);
    }

    #[test]
    fn set_volume_pins_and_recomputes_every_package() {
        let mut lines = vec![line("Sơn nước", 2.0, vec![package("A", 100), package("B", 40)])];
        recompute(&mut lines);
        set_volume(&mut lines, 0, 5.0).unwrap();
        assert!(lines[0].volume_pinned);
        assert_eq!(lines[0].packages[0].total_price, 500);
        assert_eq!(lines[0].packages[1].total_price, 200);
    }

    #[test]
    fn survey_volume_skips_pinned_lines() {
        let mut lines = vec![
            line("Sơn nước", 2.0, vec![package("A", 100)]),
            line("Trần thạch cao", 2.0, vec![package("A", 100)]),
        ];
        recompute(&mut lines);
        set_volume(&mut lines, 1, 3.0).unwrap();
        apply_survey_volume(&mut lines, 10.0);
        assert_eq!(lines[0].volume, 10.0);
        assert_eq!(lines[0].packages[0].total_price, 1000);
        assert_eq!(lines[1].volume, 3.0, "pinned volume survives the relink");
        assert_eq!(lines[1].packages[0].total_price, 300);
    }

    #[test]
    fn default_volume_is_one_without_a_survey() {
        let mut lines = vec![line("Sơn nước", 0.0, vec![package("A", 700)])];
        default_volumes(&mut lines);
        recompute(&mut lines);
        assert_eq!(lines[0].volume, 1.0);
        assert_eq!(lines[0].packages[0].total_price, 700);
    }

    #[test]
    fn aggregate_sums_across_lines_case_insensitively() {
        let mut lines = vec![
            line("Sơn nước", 2.0, vec![package("A", 100)]),
            line("Trần thạch cao", 3.0, vec![package("a", 50), package("B", 10)]),
        ];
        recompute(&mut lines);
        let aggregates = aggregate_by_package(&lines);
        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].package_name, "A");
        assert_eq!(aggregates[0].total_price, 100 * 2 + 50 * 3);
        assert_eq!(aggregates[1].total_price, 30);
    }

    #[test]
    fn duplicate_packages_merge_without_duplication() {
        let merged = normalize_lines(vec![
            line("Sơn nước", 2.0, vec![package("Gói cơ bản", 100)]),
            line("sơn nước", 2.0, vec![package("gói cơ bản", 999), package("Gói cao cấp", 300)]),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].packages.len(), 2);
        assert_eq!(merged[0].packages[0].unit_price, 100, "first occurrence wins");
    }

    #[test]
    fn totals_follow_selection() {
        let mut lines = vec![line(
            "Thiết kế nhà",
            9.0,
            vec![package("Gói cơ bản", 500_000), package("Gói cao cấp", 0)],
        )];
        recompute(&mut lines);
        assert_eq!(lines[0].packages[0].total_price, 4_500_000);
        assert_eq!(total_amount(&lines), 4_500_000);
        assert_eq!(grand_total(total_amount(&lines), 450_000), 4_950_000);
    }
}
