//! Plain-text summaries of the post-period totals.

use std::fmt::Write;

use causal_impact_core::PointSummary;

use crate::result::ImpactAnalysis;

const LABEL_WIDTH: usize = 26;
const COLUMN_WIDTH: usize = 22;

fn fmt_value(x: f64) -> String {
    if x.abs() >= 100.0 {
        format!("{x:.0}")
    } else {
        format!("{x:.2}")
    }
}

fn fmt_with_sd(s: &PointSummary) -> String {
    format!("{} ({})", fmt_value(s.mean), fmt_value(s.sd))
}

fn fmt_interval(s: &PointSummary) -> String {
    format!("[{}, {}]", fmt_value(s.lower), fmt_value(s.upper))
}

fn fmt_percent_with_sd(s: &PointSummary) -> String {
    format!("{:.1}% ({:.1}%)", 100.0 * s.mean, 100.0 * s.sd)
}

fn fmt_percent_interval(s: &PointSummary) -> String {
    format!("[{:.1}%, {:.1}%]", 100.0 * s.lower, 100.0 * s.upper)
}

fn row(out: &mut String, label: &str, average: &str, cumulative: &str) {
    let _ = writeln!(
        out,
        "{label:<lw$}{average:<cw$}{cumulative:<cw$}",
        lw = LABEL_WIDTH,
        cw = COLUMN_WIDTH
    );
}

/// Tabular summary of the post-period: actual, predicted, absolute and
/// relative effect with intervals, plus the tail-area probability.
///
/// # Example output
///
/// ```text
/// Posterior inference
///
///                           Average               Cumulative
/// Actual                    117                   3511
/// Prediction (s.d.)         107 (0.37)            3196 (11)
/// 95% CI                    [106, 107]            [3174, 3217]
///
/// Absolute effect (s.d.)    11 (0.37)             316 (11)
/// 95% CI                    [11, 11]              [294, 337]
///
/// Relative effect (s.d.)    9.9% (0.4%)           9.9% (0.4%)
/// 95% CI                    [9.2%, 10.5%]         [9.2%, 10.5%]
///
/// Posterior tail-area probability p:   0.001
/// Posterior prob. of a causal effect:  99.9%
/// ```
pub fn format_table(analysis: &ImpactAnalysis) -> String {
    let mut out = String::from("Posterior inference\n\n");
    let Some(totals) = analysis.post_period() else {
        out.push_str("No observed post-period values.\n");
        return out;
    };
    let level = format!("{:.0}% CI", 100.0 * (1.0 - analysis.summary.alpha));

    row(&mut out, "", "Average", "Cumulative");
    row(
        &mut out,
        "Actual",
        &fmt_value(totals.actual_average),
        &fmt_value(totals.actual_cumulative),
    );
    row(
        &mut out,
        "Prediction (s.d.)",
        &fmt_with_sd(&totals.predicted_average),
        &fmt_with_sd(&totals.predicted_cumulative),
    );
    row(
        &mut out,
        &level,
        &fmt_interval(&totals.predicted_average),
        &fmt_interval(&totals.predicted_cumulative),
    );
    out.push('\n');
    row(
        &mut out,
        "Absolute effect (s.d.)",
        &fmt_with_sd(&totals.effect_average),
        &fmt_with_sd(&totals.effect_cumulative),
    );
    row(
        &mut out,
        &level,
        &fmt_interval(&totals.effect_average),
        &fmt_interval(&totals.effect_cumulative),
    );
    if let Some(relative) = &totals.relative_effect {
        out.push('\n');
        // average and cumulative ratios coincide
        row(
            &mut out,
            "Relative effect (s.d.)",
            &fmt_percent_with_sd(relative),
            &fmt_percent_with_sd(relative),
        );
        row(
            &mut out,
            &level,
            &fmt_percent_interval(relative),
            &fmt_percent_interval(relative),
        );
    }
    out.push('\n');
    let _ = writeln!(out, "Posterior tail-area probability p:   {:.3}", totals.p_value);
    let _ = writeln!(
        out,
        "Posterior prob. of a causal effect:  {:.1}%",
        100.0 * totals.prob_causal_effect
    );
    out
}

/// Short narrative interpretation of the post-period totals.
pub fn format_report(analysis: &ImpactAnalysis) -> String {
    let Some(totals) = analysis.post_period() else {
        return String::from("The post-period has no observed values; no effect can be estimated.\n");
    };
    let level = 100.0 * (1.0 - analysis.summary.alpha);
    let effect = &totals.effect_average;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "During the post-intervention period the response averaged {}. Without the \
         intervention an average of {} would have been expected ({level:.0}% interval [{}, {}]).",
        fmt_value(totals.actual_average),
        fmt_value(totals.predicted_average.mean),
        fmt_value(totals.predicted_average.lower),
        fmt_value(totals.predicted_average.upper),
    );
    let _ = writeln!(
        out,
        "The estimated average effect is {} ({level:.0}% interval [{}, {}]); summed over \
         {} steps the effect is {}.",
        fmt_value(effect.mean),
        fmt_value(effect.lower),
        fmt_value(effect.upper),
        totals.n_steps,
        fmt_value(totals.effect_cumulative.mean),
    );

    if analysis.is_significant() {
        let direction = if effect.mean > 0.0 { "increase" } else { "decrease" };
        let _ = writeln!(
            out,
            "The interval excludes zero: the {direction} is unlikely to be due to chance \
             (p = {:.3}, posterior probability of an effect {:.1}%).",
            totals.p_value,
            100.0 * totals.prob_causal_effect
        );
    } else {
        let _ = writeln!(
            out,
            "The interval includes zero, so the apparent effect may be due to chance \
             (p = {:.3}).",
            totals.p_value
        );
    }

    if !analysis.diagnostics.converged() {
        let _ = writeln!(
            out,
            "Warning: chains have not converged (R-hat {:.2}); run more iterations.",
            analysis.diagnostics.max_r_hat().unwrap_or(f64::NAN)
        );
    }
    out
}
