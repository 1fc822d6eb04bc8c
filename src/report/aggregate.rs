use crate::report::model::{ArithmeticOperator, CategoryRow};
use crate::report::predicate::Category;
use crate::values::Row;

/// 固定调色板；类别按下标循环取色
pub const PALETTE: [&str; 8] = [
    "#8884d8", "#82ca9d", "#ffc658", "#ff8042", "#0088fe", "#00c49f", "#ffbb28", "#a4de6c",
];

pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// 已解析为属性 id 的计算字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputedPair {
    pub field_a: i32,
    pub field_b: i32,
    pub operator: ArithmeticOperator,
}

/// 缺少操作数、除零或结果非有限时返回 None
pub fn calculate(a: Option<f64>, b: Option<f64>, op: ArithmeticOperator) -> Option<f64> {
    let (a, b) = (a?, b?);
    let out = match op {
        ArithmeticOperator::Add => a + b,
        ArithmeticOperator::Sub => a - b,
        ArithmeticOperator::Mul => a * b,
        ArithmeticOperator::Div => {
            if b == 0.0 {
                return None;
            }
            a / b
        }
    };
    out.is_finite().then_some(out)
}

/// 所有命中行中，属于 metric 属性的 number 值之和
pub fn sum_metrics(rows: &[Row], metric_ids: &[i32]) -> f64 {
    rows.iter()
        .flat_map(|row| row.values.iter())
        .filter(|v| metric_ids.contains(&v.property_id))
        .filter_map(|v| v.value.as_number())
        .sum()
}

/// 单行所有计算字段的非空结果之和
pub fn row_computed(row: &Row, pairs: &[ComputedPair]) -> f64 {
    pairs
        .iter()
        .filter_map(|p| {
            calculate(
                row.number_of(p.field_a),
                row.number_of(p.field_b),
                p.operator,
            )
        })
        .sum()
}

pub fn sum_computed(rows: &[Row], pairs: &[ComputedPair]) -> f64 {
    rows.iter().map(|row| row_computed(row, pairs)).sum()
}

fn in_category(row: &Row, group_property_id: i32, category: &Category) -> bool {
    row.values
        .iter()
        .any(|v| v.property_id == group_property_id && v.value.contains_text(&category.value))
}

/// 每个类别的命中行数；没有命中的类别计 0
pub fn count_by_category(
    rows: &[Row],
    group_property_id: i32,
    categories: &[Category],
) -> Vec<usize> {
    categories
        .iter()
        .map(|c| {
            rows.iter()
                .filter(|row| in_category(row, group_property_id, c))
                .count()
        })
        .collect()
}

/// 累积阶段：每个类别收集其行的计算结果（每行一项）
pub fn computed_by_category(
    rows: &[Row],
    group_property_id: i32,
    categories: &[Category],
    pairs: &[ComputedPair],
) -> Vec<Vec<f64>> {
    categories
        .iter()
        .map(|c| {
            rows.iter()
                .filter(|row| in_category(row, group_property_id, c))
                .map(|row| row_computed(row, pairs))
                .collect()
        })
        .collect()
}

/// 归一化阶段：用 0 补齐到最长类别的长度
pub fn pad_to_equal_length(series: &mut [Vec<f64>]) {
    let longest = series.iter().map(Vec::len).max().unwrap_or(0);
    for s in series.iter_mut() {
        s.resize(longest, 0.0);
    }
}

pub fn count_rows_output(
    categories: &[Category],
    counts: &[usize],
    key: &str,
    with_fill: bool,
) -> Vec<CategoryRow> {
    categories
        .iter()
        .zip(counts)
        .enumerate()
        .map(|(idx, (c, n))| CategoryRow {
            category: c.value.clone(),
            label: c.label.clone(),
            values: vec![(key.to_string(), *n as f64)],
            fill: with_fill.then(|| palette_color(idx).to_string()),
        })
        .collect()
}

/// `series[i]` 的值依次命名为 `<key>1`, `<key>2`, ...
pub fn series_output(
    categories: &[Category],
    series: &[Vec<f64>],
    key: &str,
    with_fill: bool,
) -> Vec<CategoryRow> {
    categories
        .iter()
        .zip(series)
        .enumerate()
        .map(|(idx, (c, values))| CategoryRow {
            category: c.value.clone(),
            label: c.label.clone(),
            values: values
                .iter()
                .enumerate()
                .map(|(n, v)| (format!("{key}{}", n + 1), *v))
                .collect(),
            fill: with_fill.then(|| palette_color(idx).to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{job_row, JOB_BONUS, JOB_SALARY, JOB_STATUS};

    fn cats() -> Vec<Category> {
        ["Open", "Closed", "Filled"]
            .iter()
            .map(|s| Category::new(*s))
            .collect()
    }

    #[test]
    fn test_calculate_operators() {
        assert_eq!(calculate(Some(6.0), Some(3.0), ArithmeticOperator::Add), Some(9.0));
        assert_eq!(calculate(Some(6.0), Some(3.0), ArithmeticOperator::Sub), Some(3.0));
        assert_eq!(calculate(Some(6.0), Some(3.0), ArithmeticOperator::Mul), Some(18.0));
        assert_eq!(calculate(Some(6.0), Some(3.0), ArithmeticOperator::Div), Some(2.0));
    }

    #[test]
    fn test_division_by_zero_and_missing_operand_yield_none() {
        assert_eq!(calculate(Some(1.0), Some(0.0), ArithmeticOperator::Div), None);
        assert_eq!(calculate(None, Some(2.0), ArithmeticOperator::Add), None);
        assert_eq!(calculate(Some(1.0), None, ArithmeticOperator::Mul), None);
    }

    #[test]
    fn test_sum_metrics_only_counts_metric_properties() {
        let rows = vec![
            job_row(1, "Open", Some(10.0), Some(1.0)),
            job_row(2, "Open", Some(20.0), Some(2.0)),
            job_row(3, "Closed", Some(30.0), None),
        ];
        assert_eq!(sum_metrics(&rows, &[JOB_SALARY]), 60.0);
        assert_eq!(sum_metrics(&rows, &[JOB_SALARY, JOB_BONUS]), 63.0);
        assert_eq!(sum_metrics(&rows, &[]), 0.0);
    }

    #[test]
    fn test_sum_computed_skips_division_by_zero() {
        let rows = vec![
            job_row(1, "Open", Some(10.0), Some(2.0)),
            job_row(2, "Open", Some(20.0), Some(0.0)),
            job_row(3, "Open", Some(30.0), None),
        ];
        let pairs = [ComputedPair {
            field_a: JOB_SALARY,
            field_b: JOB_BONUS,
            operator: ArithmeticOperator::Div,
        }];
        assert_eq!(sum_computed(&rows, &pairs), 5.0);
    }

    #[test]
    fn test_count_by_category_includes_zero_categories() {
        let rows = vec![
            job_row(1, "Open", None, None),
            job_row(2, "Open", None, None),
            job_row(3, "Filled", None, None),
        ];
        let counts = count_by_category(&rows, JOB_STATUS, &cats());
        assert_eq!(counts, vec![2, 0, 1]);
        // 其他属性上的同名文本不计入
        assert_eq!(count_by_category(&rows, JOB_SALARY, &cats()), vec![0, 0, 0]);
    }

    #[test]
    fn test_padding_is_a_separate_pass() {
        let rows = vec![
            job_row(1, "Open", Some(1.0), Some(1.0)),
            job_row(2, "Open", Some(2.0), Some(2.0)),
            job_row(3, "Closed", Some(5.0), Some(1.0)),
        ];
        let pairs = [ComputedPair {
            field_a: JOB_SALARY,
            field_b: JOB_BONUS,
            operator: ArithmeticOperator::Add,
        }];
        let mut series = computed_by_category(&rows, JOB_STATUS, &cats(), &pairs);
        assert_eq!(series, vec![vec![2.0, 4.0], vec![6.0], vec![]]);

        pad_to_equal_length(&mut series);
        assert_eq!(series, vec![vec![2.0, 4.0], vec![6.0, 0.0], vec![0.0, 0.0]]);

        let out = series_output(&cats(), &series, "job", false);
        assert_eq!(out[1].value("job1"), Some(6.0));
        assert_eq!(out[1].value("job2"), Some(0.0));
        assert!(out.iter().all(|r| r.fill.is_none()));
    }

    #[test]
    fn test_category_is_option_value_not_name() {
        let rows = vec![job_row(1, "open", None, None), job_row(2, "open", None, None)];
        let cats = vec![Category {
            value: "open".into(),
            label: Some("Open Position".into()),
        }];
        let counts = count_by_category(&rows, JOB_STATUS, &cats);
        let out = count_rows_output(&cats, &counts, "job", true);
        assert_eq!(out[0].category, "open");
        assert_eq!(out[0].label.as_deref(), Some("Open Position"));
        assert_eq!(out[0].value("job"), Some(2.0));
    }

    #[test]
    fn test_fill_cycles_palette() {
        let many: Vec<Category> = (0..10).map(|i| Category::new(i.to_string())).collect();
        let out = count_rows_output(&many, &[0; 10], "job", true);
        assert_eq!(out[0].fill.as_deref(), Some(PALETTE[0]));
        assert_eq!(out[8].fill.as_deref(), Some(PALETTE[0]));
        assert_eq!(out[9].fill.as_deref(), Some(PALETTE[1]));
    }
}
