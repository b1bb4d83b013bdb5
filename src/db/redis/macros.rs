/// A macro to simplify read-through caching of optional values.
///
/// This macro checks if a value is present in the cache.
/// If found, it returns `Some` of the cached value.
/// If not found, it executes the provided block to compute the value and,
/// when the block produced `Some`, queues it for a background cache write.
/// `None` results are returned but never stored.
///
/// The cache is optional and never fails the caller: with `None`, or when
/// the backend cannot be reached, the block is simply executed.
///
/// # Arguments
/// * `$cache`: An `Option<&Cache>`.
/// * `$key`: The key to use for caching the value.
/// * `$ttl`: The time-to-live (TTL) for the cached value in seconds.
/// * `$block`: Future producing `AppResult<Option<T>>`, run on a miss.
///
/// # Example
/// ```rust,ignore
/// let feed: Option<Vec<FeedEntry>> = cached!(self.cache.as_ref(), key, ttl, async {
///     self.compute_feed(username).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        match $cache {
            Some(cache) => match cache.lookup(&key).await {
                Some(hit) => Ok(Some(hit)),
                None => match $block.await {
                    Ok(Some(value)) => {
                        cache.set_in_background(&key, &value, $ttl);
                        Ok(Some(value))
                    }
                    other => other,
                },
            },
            None => $block.await,
        }
    }};
}
