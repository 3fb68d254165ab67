/// Chains a panic hook that emits panics as tracing events so they end up in
/// the same sink as regular logs before the default hook prints the backtrace.
pub fn install() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("thread panicked: {info}");
        default_hook(info);
    }));
}
