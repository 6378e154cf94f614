//! 动作处理函数。
//!
//! 这里的函数都是同步的纯计算，只读访问数据集，由工作池在阻塞线程上调用。
//! 每个函数返回已经序列化好的响应文本，分发器只负责把它写回连接。

use crate::dataset::DatasetStore;
use crate::error::AppError;
use dashboard_models::{ActionRequest, DatasetResponse, MeansResponse, MessageAction};
use log::debug;

/// 把 `value` 按特征的 `[min, max]` 区间映射到 `[0, 1]`。
///
/// `min == max`（该特征在全部行上取值相同）时结果为 `0.0`。
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span <= 0.0 {
        return 0.0;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}

/// 执行一次请求对应的处理函数，返回响应帧文本。
pub fn handle_action(store: &DatasetStore, request: &ActionRequest) -> Result<String, AppError> {
    debug!("[处理函数] 执行动作 {}", request.action());
    match request {
        ActionRequest::PassData => {
            let response = serialize_dataset(store)?;
            Ok(serde_json::to_string(&response)?)
        }
        ActionRequest::PassSelectionMeans { indices } => {
            let response = selection_means(store, indices)?;
            Ok(serde_json::to_string(&response)?)
        }
        ActionRequest::PassOverallMeans => Ok(serde_json::to_string(&overall_means(store))?),
    }
}

/// 把全部行序列化为行记录数组，连同特征名与类别名一起返回。
pub fn serialize_dataset(store: &DatasetStore) -> Result<DatasetResponse, AppError> {
    let records: Vec<_> = store.records().collect();
    Ok(DatasetResponse {
        action: MessageAction::PassData,
        content: serde_json::to_string(&records)?,
        feature_names: store.feature_names().to_vec(),
        class_names: store.class_names().to_vec(),
    })
}

/// 选中行的归一化均值。空索引表示全部行。
///
/// 任何一个索引不在 `[0, row_count)` 内时整个请求失败，不返回部分结果。
pub fn selection_means(store: &DatasetStore, indices: &[i64]) -> Result<MeansResponse, AppError> {
    if indices.is_empty() {
        return Ok(means_response(store, MessageAction::PassSelectionMeans, 0..store.row_count()));
    }

    let row_count = store.row_count();
    let rows = indices
        .iter()
        .map(|&index| {
            usize::try_from(index)
                .ok()
                .filter(|&row| row < row_count)
                .ok_or(AppError::InvalidIndex { index, row_count })
        })
        .collect::<Result<Vec<usize>, AppError>>()?;

    Ok(means_response(store, MessageAction::PassSelectionMeans, rows))
}

/// 全部行的归一化均值。
pub fn overall_means(store: &DatasetStore) -> MeansResponse {
    means_response(store, MessageAction::PassOverallMeans, 0..store.row_count())
}

/// 对给定的行（调用方保证非空且均在范围内）按特征求均值，再做归一化。
fn means_response<I>(store: &DatasetStore, action: MessageAction, rows: I) -> MeansResponse
where
    I: IntoIterator<Item = usize>,
{
    let mut sums = vec![0.0; store.feature_count()];
    let mut count = 0usize;
    for row in rows.into_iter().filter_map(|index| store.row(index)) {
        for (sum, value) in sums.iter_mut().zip(&row.features) {
            *sum += value;
        }
        count += 1;
    }

    let means = sums
        .iter()
        .zip(store.feature_min().iter().zip(store.feature_max()))
        .map(|(sum, (&min, &max))| {
            let mean = if count == 0 { min } else { sum / count as f64 };
            normalize(mean, min, max)
        })
        .collect();

    MeansResponse { action, means, count }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn sample_store() -> DatasetStore {
        DatasetStore::from_matrix(
            names(&["f0", "f1"]),
            names(&["class_0"]),
            vec![vec![1.0, 10.0], vec![3.0, 30.0], vec![5.0, 20.0]],
        )
        .expect("构建测试数据集失败")
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "实际值 {:?}，期望值 {:?}", actual, expected);
        }
    }

    #[test]
    fn test_normalize_degenerate_span_is_zero() {
        assert_eq!(normalize(7.0, 7.0, 7.0), 0.0);
        assert_eq!(normalize(2.0, 1.0, 3.0), 0.5);
        assert_eq!(normalize(3.0, 1.0, 3.0), 1.0);
    }

    #[test]
    /// 行 [1,10] 和 [5,20]：特征 0 的均值 3 映射为 0.5，特征 1 的均值 15 映射为 0.25。
    fn test_selection_means_worked_example() {
        let store = sample_store();
        let response = selection_means(&store, &[0, 2]).expect("计算选中均值失败");
        assert_eq!(response.action, MessageAction::PassSelectionMeans);
        assert_eq!(response.count, 2);
        assert_close(&response.means, &[0.5, 0.25]);
    }

    #[test]
    fn test_selection_means_rejects_out_of_range_index() {
        let store = sample_store();
        match selection_means(&store, &[0, 5]) {
            Err(AppError::InvalidIndex { index, row_count }) => {
                assert_eq!(index, 5);
                assert_eq!(row_count, 3);
            }
            other => panic!("期望 InvalidIndex，实际为 {:?}", other),
        }
        assert!(matches!(
            selection_means(&store, &[-1]),
            Err(AppError::InvalidIndex { index: -1, .. })
        ));
    }

    #[test]
    fn test_empty_selection_equals_overall() {
        let store = sample_store();
        let selection = selection_means(&store, &[]).expect("计算空选择均值失败");
        let overall = overall_means(&store);
        assert_eq!(selection.count, 3);
        assert_eq!(overall.count, 3);
        assert_eq!(overall.action, MessageAction::PassOverallMeans);
        assert_close(&selection.means, &overall.means);
        // 特征 0 的均值 3 映射为 0.5，特征 1 的均值 20 映射为 0.5
        assert_close(&overall.means, &[0.5, 0.5]);
    }

    #[test]
    /// 重复索引按给定次数计入。
    fn test_duplicate_indices_counted_as_given() {
        let store = sample_store();
        let response = selection_means(&store, &[1, 1, 0]).expect("计算选中均值失败");
        assert_eq!(response.count, 3);
        // 特征 0: (3+3+1)/3 = 7/3 -> (7/3-1)/4 = 1/3
        assert_close(&response.means[..1], &[1.0 / 3.0]);
    }

    #[test]
    fn test_means_stay_in_unit_interval() {
        let store = DatasetStore::from_matrix(
            names(&["constant", "spread"]),
            names(&["class_0"]),
            vec![vec![4.0, -2.0], vec![4.0, 8.0], vec![4.0, 0.5]],
        )
        .expect("构建测试数据集失败");
        for indices in [vec![0], vec![1], vec![0, 1, 2], vec![]] {
            let response = selection_means(&store, &indices).expect("计算选中均值失败");
            assert_eq!(response.means[0], 0.0, "取值恒定的特征应归一化为 0");
            assert!(response.means.iter().all(|m| (0.0..=1.0).contains(m)));
        }
    }

    #[test]
    fn test_serialize_dataset_contains_every_row() {
        let store = sample_store();
        let response = serialize_dataset(&store).expect("序列化数据集失败");
        assert_eq!(response.feature_names, names(&["f0", "f1"]));
        assert_eq!(response.class_names, names(&["class_0"]));

        let rows: Vec<Value> = serde_json::from_str(&response.content).expect("content 应是 JSON 数组");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1]["f0"], 3.0);
        assert_eq!(rows[1]["f1"], 30.0);
    }

    #[test]
    fn test_handle_action_produces_response_frames() {
        let store = sample_store();
        let text = handle_action(&store, &ActionRequest::PassOverallMeans).expect("处理 overall-means 失败");
        let value: Value = serde_json::from_str(&text).expect("响应应是合法 JSON");
        assert_eq!(value["action"], 2);
        assert_eq!(value["count"], 3);

        let text = handle_action(&store, &ActionRequest::PassData).expect("处理 serialize-dataset 失败");
        let value: Value = serde_json::from_str(&text).expect("响应应是合法 JSON");
        assert_eq!(value["action"], 0);
        assert!(value["content"].is_string());

        let error = handle_action(&store, &ActionRequest::PassSelectionMeans { indices: vec![3] })
            .expect_err("越界索引应失败");
        assert_eq!(error.kind(), "InvalidIndex");
    }
}
