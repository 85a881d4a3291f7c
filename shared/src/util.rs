/// Current UTC timestamp in epoch seconds
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a human-facing order number: `#` + 6 random digits.
///
/// Matches the short codes the gateway hands out, so locally created
/// orders are indistinguishable from confirmed ones on screen.
pub fn order_number() -> String {
    use rand::Rng;
    let n: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("#{}", n)
}
