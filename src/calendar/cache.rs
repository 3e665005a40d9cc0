use crate::errors::{Result, CalendarError};
use crate::models::calendar::{CalendarCacheRange, TradingDateEntry};
use crate::sources::base::CalendarSource;
use chrono::NaiveDate;
use log::{debug, info};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

/// 交易日历缓存
///
/// 持有按起始日期排序、互不相交且互不相邻的日历片段。缺失的日期按缺口
/// 分段向数据源补齐，合并后整体替换片段列表，读者只会看到替换前或替换后
/// 的完整状态。片段只扩展不收缩，缓存随所有者一起释放。
pub struct CalendarCache {
    source: Arc<dyn CalendarSource + Send + Sync>,
    ranges: RwLock<Arc<Vec<CalendarCacheRange>>>,
    merge_lock: Mutex<()>,
}

impl CalendarCache {
    pub fn new(source: Arc<dyn CalendarSource + Send + Sync>) -> Self {
        Self {
            source,
            ranges: RwLock::new(Arc::new(Vec::new())),
            merge_lock: Mutex::new(()),
        }
    }

    fn snapshot(&self) -> Arc<Vec<CalendarCacheRange>> {
        self.ranges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 保证 [start, end] 内每一天都已缓存，只拉取尚未覆盖的子区间
    pub async fn ensure_covered(&self, start: NaiveDate, end: NaiveDate) -> Result<()> {
        if start > end {
            return Err(CalendarError::InvalidRange { start, end });
        }
        if Self::gaps(&self.snapshot(), start, end).is_empty() {
            return Ok(());
        }

        // 拉取期间一直持锁：同一天只会被拉取一次，代价是不相交区间的拉取也被串行化。
        // 调用方并发很低，这里不再细分锁粒度
        let _guard = self.merge_lock.lock().await;

        // 等锁期间其他调用者可能已经补齐
        let current = self.snapshot();
        let gaps = Self::gaps(&current, start, end);
        if gaps.is_empty() {
            return Ok(());
        }

        let mut fetched = Vec::with_capacity(gaps.len());
        for (gap_start, gap_end) in gaps {
            debug!("Fetching {} calendar for {}..{}", self.source.source_name(), gap_start, gap_end);
            let entries = self.source.fetch_trade_dates(gap_start, gap_end).await?;
            fetched.push(CalendarCacheRange::new(gap_start, gap_end, entries)?);
        }

        let merged = Self::merge(&current, fetched);
        info!(
            "Calendar cache now holds {} range(s), {} day(s)",
            merged.len(),
            merged.iter().map(|r| r.entries().len()).sum::<usize>()
        );

        *self.ranges.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(merged);
        Ok(())
    }

    /// 查询单日状态，未覆盖时返回 NotCovered
    pub fn lookup(&self, date: NaiveDate) -> Result<TradingDateEntry> {
        let ranges = self.snapshot();
        let idx = ranges.partition_point(|r| r.end() < date);
        ranges
            .get(idx)
            .and_then(|r| r.get(date))
            .copied()
            .ok_or(CalendarError::NotCovered(date))
    }

    /// [start, end] 内逐日状态，区间须已覆盖，否则返回第一个未覆盖日期的 NotCovered
    pub fn entries_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TradingDateEntry>> {
        if start > end {
            return Err(CalendarError::InvalidRange { start, end });
        }
        let ranges = self.snapshot();
        // 片段互不相邻，已覆盖的区间必然落在同一个片段内
        let idx = ranges.partition_point(|r| r.end() < start);
        match ranges.get(idx) {
            Some(range) if range.contains(start) && range.contains(end) => {
                let from = (start - range.start()).num_days() as usize;
                let to = (end - range.start()).num_days() as usize;
                Ok(range.entries()[from..=to].to_vec())
            }
            _ => {
                let missing = Self::gaps(&ranges, start, end)
                    .first()
                    .map_or(start, |(gap_start, _)| *gap_start);
                Err(CalendarError::NotCovered(missing))
            }
        }
    }

    pub fn is_covered(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= end && Self::gaps(&self.snapshot(), start, end).is_empty()
    }

    /// 当前缓存的片段区间
    pub fn ranges(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.snapshot().iter().map(|r| (r.start(), r.end())).collect()
    }

    pub fn covered_days(&self) -> usize {
        self.snapshot().iter().map(|r| r.entries().len()).sum()
    }

    // ranges 已排序且互不相邻
    fn gaps(ranges: &[CalendarCacheRange], start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
        let mut gaps = Vec::new();
        let mut cursor = Some(start);

        for range in ranges.iter().skip_while(|r| r.end() < start) {
            let current = match cursor {
                Some(c) => c,
                None => break,
            };
            if range.start() > end {
                break;
            }
            if let Some(before) = range.start().pred_opt() {
                if before >= current {
                    gaps.push((current, before));
                }
            }
            cursor = if range.end() >= end { None } else { range.end().succ_opt() };
        }

        if let Some(c) = cursor {
            if c <= end {
                gaps.push((c, end));
            }
        }
        gaps
    }

    fn merge(current: &[CalendarCacheRange], fetched: Vec<CalendarCacheRange>) -> Vec<CalendarCacheRange> {
        let mut all: Vec<CalendarCacheRange> = current.iter().cloned().chain(fetched).collect();
        all.sort_by_key(|r| r.start());

        let mut merged: Vec<CalendarCacheRange> = Vec::with_capacity(all.len());
        for range in all {
            match merged.last_mut() {
                Some(last) if last.touches(&range) => last.absorb(range),
                _ => merged.push(range),
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::weekday::WeekdayCalendarSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// 记录每次拉取区间的数据源
    struct RecordingSource {
        inner: WeekdayCalendarSource,
        calls: StdMutex<Vec<(NaiveDate, NaiveDate)>>,
        fail: bool,
    }

    impl RecordingSource {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                inner: WeekdayCalendarSource::new([ymd(2025, 1, 1)]),
                calls: StdMutex::new(Vec::new()),
                fail,
            })
        }

        fn calls(&self) -> Vec<(NaiveDate, NaiveDate)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CalendarSource for RecordingSource {
        fn source_name(&self) -> &'static str {
            "recording"
        }

        async fn fetch_trade_dates(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TradingDateEntry>> {
            self.calls.lock().unwrap().push((start, end));
            if self.fail {
                return Err(CalendarError::DataSource("provider unreachable".to_string()));
            }
            self.inner.fetch_trade_dates(start, end).await
        }
    }

    #[tokio::test]
    async fn test_lookup_before_coverage_is_not_covered() {
        let cache = CalendarCache::new(RecordingSource::new(false));
        let err = cache.lookup(ymd(2025, 1, 3)).unwrap_err();
        assert!(matches!(err, CalendarError::NotCovered(_)));
    }

    #[tokio::test]
    async fn test_ensure_covered_then_lookup() {
        let cache = CalendarCache::new(RecordingSource::new(false));
        cache.ensure_covered(ymd(2025, 1, 1), ymd(2025, 1, 5)).await.unwrap();

        assert!(!cache.lookup(ymd(2025, 1, 1)).unwrap().is_trading);
        assert!(cache.lookup(ymd(2025, 1, 3)).unwrap().is_trading);
        assert!(!cache.lookup(ymd(2025, 1, 4)).unwrap().is_trading);
        assert!(cache.lookup(ymd(2025, 1, 6)).is_err());
    }

    #[tokio::test]
    async fn test_only_gaps_are_fetched() {
        let source = RecordingSource::new(false);
        let cache = CalendarCache::new(source.clone());

        cache.ensure_covered(ymd(2025, 1, 10), ymd(2025, 1, 20)).await.unwrap();
        cache.ensure_covered(ymd(2025, 2, 1), ymd(2025, 2, 10)).await.unwrap();
        cache.ensure_covered(ymd(2025, 1, 5), ymd(2025, 2, 15)).await.unwrap();

        assert_eq!(
            source.calls(),
            vec![
                (ymd(2025, 1, 10), ymd(2025, 1, 20)),
                (ymd(2025, 2, 1), ymd(2025, 2, 10)),
                (ymd(2025, 1, 5), ymd(2025, 1, 9)),
                (ymd(2025, 1, 21), ymd(2025, 1, 31)),
                (ymd(2025, 2, 11), ymd(2025, 2, 15)),
            ]
        );
        assert_eq!(cache.ranges(), vec![(ymd(2025, 1, 5), ymd(2025, 2, 15))]);
        assert_eq!(cache.covered_days(), 42);
    }

    #[tokio::test]
    async fn test_covered_range_is_not_refetched() {
        let source = RecordingSource::new(false);
        let cache = CalendarCache::new(source.clone());

        cache.ensure_covered(ymd(2025, 1, 1), ymd(2025, 1, 31)).await.unwrap();
        cache.ensure_covered(ymd(2025, 1, 10), ymd(2025, 1, 12)).await.unwrap();
        cache.ensure_covered(ymd(2025, 1, 31), ymd(2025, 1, 31)).await.unwrap();

        assert_eq!(source.calls().len(), 1);
        assert!(cache.is_covered(ymd(2025, 1, 1), ymd(2025, 1, 31)));
        assert!(!cache.is_covered(ymd(2025, 1, 1), ymd(2025, 2, 1)));
    }

    #[tokio::test]
    async fn test_adjacent_ranges_merge_without_duplicates() {
        let cache = CalendarCache::new(RecordingSource::new(false));
        cache.ensure_covered(ymd(2025, 1, 1), ymd(2025, 1, 10)).await.unwrap();
        cache.ensure_covered(ymd(2025, 1, 11), ymd(2025, 1, 20)).await.unwrap();
        cache.ensure_covered(ymd(2025, 1, 25), ymd(2025, 1, 26)).await.unwrap();

        assert_eq!(
            cache.ranges(),
            vec![(ymd(2025, 1, 1), ymd(2025, 1, 20)), (ymd(2025, 1, 25), ymd(2025, 1, 26))]
        );
        assert_eq!(cache.covered_days(), 22);
    }

    #[tokio::test]
    async fn test_entries_between_slices_one_range() {
        let cache = CalendarCache::new(RecordingSource::new(false));
        cache.ensure_covered(ymd(2024, 12, 20), ymd(2025, 1, 20)).await.unwrap();

        let entries = cache.entries_between(ymd(2024, 12, 31), ymd(2025, 1, 3)).unwrap();
        assert_eq!(
            entries,
            vec![
                TradingDateEntry::new(ymd(2024, 12, 31), true),
                TradingDateEntry::new(ymd(2025, 1, 1), false),
                TradingDateEntry::new(ymd(2025, 1, 2), true),
                TradingDateEntry::new(ymd(2025, 1, 3), true),
            ]
        );
        assert_eq!(cache.entries_between(ymd(2025, 1, 20), ymd(2025, 1, 20)).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_entries_between_reports_first_missing_day() {
        let cache = CalendarCache::new(RecordingSource::new(false));
        cache.ensure_covered(ymd(2025, 1, 1), ymd(2025, 1, 10)).await.unwrap();
        cache.ensure_covered(ymd(2025, 1, 15), ymd(2025, 1, 20)).await.unwrap();

        let err = cache.entries_between(ymd(2025, 1, 5), ymd(2025, 1, 18)).unwrap_err();
        assert!(matches!(err, CalendarError::NotCovered(d) if d == ymd(2025, 1, 11)));
        let err = cache.entries_between(ymd(2024, 12, 30), ymd(2025, 1, 2)).unwrap_err();
        assert!(matches!(err, CalendarError::NotCovered(d) if d == ymd(2024, 12, 30)));
        let err = cache.entries_between(ymd(2025, 1, 3), ymd(2025, 1, 2)).unwrap_err();
        assert!(matches!(err, CalendarError::InvalidRange { .. }));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_cache_unchanged() {
        let cache = CalendarCache::new(RecordingSource::new(true));
        let err = cache.ensure_covered(ymd(2025, 1, 1), ymd(2025, 1, 5)).await.unwrap_err();
        assert_eq!(err.kind(), "data_source");
        assert!(cache.ranges().is_empty());
    }

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let source = RecordingSource::new(false);
        let cache = CalendarCache::new(source.clone());
        let err = cache.ensure_covered(ymd(2025, 1, 5), ymd(2025, 1, 1)).await.unwrap_err();
        assert!(matches!(err, CalendarError::InvalidRange { .. }));
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_coverage_is_consistent() {
        let source = RecordingSource::new(false);
        let cache = Arc::new(CalendarCache::new(source.clone()));

        let mut handles = Vec::new();
        for i in 0..8u64 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let start = ymd(2025, 1, 1) + chrono::Days::new(i * 5);
                let end = start + chrono::Days::new(9);
                cache.ensure_covered(start, end).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(cache.ranges(), vec![(ymd(2025, 1, 1), ymd(2025, 2, 14))]);
        assert_eq!(cache.covered_days(), 45);

        // 每一天只被拉取一次
        let fetched: usize = source
            .calls()
            .iter()
            .map(|(s, e)| ((*e - *s).num_days() + 1) as usize)
            .sum();
        assert_eq!(fetched, 45);
    }

    /// 统计同时进行中的拉取数
    struct SlowSource {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl CalendarSource for SlowSource {
        fn source_name(&self) -> &'static str {
            "slow"
        }

        async fn fetch_trade_dates(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TradingDateEntry>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            WeekdayCalendarSource::new([]).fetch_trade_dates(start, end).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_disjoint_fetches_are_serialized() {
        let source = Arc::new(SlowSource {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let cache = Arc::new(CalendarCache::new(source.clone()));

        let mut handles = Vec::new();
        for month in 1..=4u32 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.ensure_covered(ymd(2025, month, 1), ymd(2025, month, 10)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(source.peak.load(Ordering::SeqCst), 1);
        assert_eq!(cache.ranges().len(), 4);
    }
}
