//! Pairwise IoU (Intersection over Union) between box sets.

use nalgebra::DMatrix;

/// Area of each box in an (n, 4) `[x1, y1, x2, y2]` matrix.
pub fn box_area(boxes: &DMatrix<f64>) -> Vec<f64> {
    (0..boxes.nrows())
        .map(|i| (boxes[(i, 2)] - boxes[(i, 0)]) * (boxes[(i, 3)] - boxes[(i, 1)]))
        .collect()
}

/// Compute the IoU matrix between two sets of boxes.
///
/// # Arguments
/// * `boxes_a` - First set of boxes, shape (n, 4), format [x1, y1, x2, y2]
/// * `boxes_b` - Second set of boxes, shape (m, 4), format [x1, y1, x2, y2]
///
/// # Returns
/// IoU matrix of shape (n, m). Pairs whose union is empty get IoU 0.
pub fn box_iou(boxes_a: &DMatrix<f64>, boxes_b: &DMatrix<f64>) -> DMatrix<f64> {
    let n = boxes_a.nrows();
    let m = boxes_b.nrows();

    if n == 0 || m == 0 {
        return DMatrix::zeros(n, m);
    }

    let area_a = box_area(boxes_a);
    let area_b = box_area(boxes_b);

    DMatrix::from_fn(n, m, |i, j| {
        let inter_w = (boxes_a[(i, 2)].min(boxes_b[(j, 2)]) - boxes_a[(i, 0)].max(boxes_b[(j, 0)]))
            .max(0.0);
        let inter_h = (boxes_a[(i, 3)].min(boxes_b[(j, 3)]) - boxes_a[(i, 1)].max(boxes_b[(j, 1)]))
            .max(0.0);
        let inter_area = inter_w * inter_h;
        let union_area = area_a[i] + area_b[j] - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    })
}
