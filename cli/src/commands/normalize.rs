use radio_charts::normalize::normalize;

/// Print the comparison key, display form and parse outcome for each string
pub fn show_normalized(inputs: &[String]) {
    for raw in inputs {
        let track = normalize(raw);
        let marker = if track.needs_review() { "⚠️ " } else { "✅" };
        println!("{marker} '{raw}'");
        println!("    display: {}", track.display());
        println!("    key:     {}", track.canonical.cache_key());
        println!("    outcome: {:?}", track.outcome);
    }
}
