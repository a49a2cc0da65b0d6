/// Keep-alive handle the host platform provides so the process survives while
/// a trip is being recorded. The controller only ever starts and stops it;
/// everything else about it is the platform's business.
pub trait ForegroundTask: Send + Sync {
    fn start(&self);
    fn stop(&self);
}

/// For tests and the simulator, where nothing needs keeping alive.
pub struct NoopForegroundTask;

impl ForegroundTask for NoopForegroundTask {
    fn start(&self) {}

    fn stop(&self) {}
}
