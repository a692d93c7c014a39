//! Binary STL export of an already tessellated mesh, inline or on a
//! worker thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use brep_kernel::RenderMesh;
use tracing::{debug, warn};

use crate::errors::ExportError;

/// Triangles written between progress reports and cancellation checks.
const BATCH: usize = 1024;

/// Messages from an export worker. Exactly one of `Completed`, `Failed`
/// or `Cancelled` ends every job.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    /// Percent done, non-decreasing.
    Progress(u8),
    Completed(Vec<u8>),
    Failed(String),
    Cancelled,
}

fn check_indices(mesh: &RenderMesh) -> Result<usize, ExportError> {
    let tri_count = mesh.indices.len() / 3;
    if tri_count == 0 {
        return Err(ExportError::EmptyMesh);
    }
    let vertex_count = mesh.vertices.len() / 3;
    if let Some(&index) = mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(ExportError::IndexOutOfRange {
            index,
            vertex_count,
        });
    }
    Ok(tri_count)
}

fn vertex(mesh: &RenderMesh, index: u32) -> [f32; 3] {
    let i = index as usize * 3;
    [mesh.vertices[i], mesh.vertices[i + 1], mesh.vertices[i + 2]]
}

fn facet_normal(v: [[f32; 3]; 3]) -> [f32; 3] {
    let a = [v[1][0] - v[0][0], v[1][1] - v[0][1], v[1][2] - v[0][2]];
    let b = [v[2][0] - v[0][0], v[2][1] - v[0][1], v[2][2] - v[0][2]];
    let n = [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 1e-12 {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0, 0.0, 1.0]
    }
}

/// Encode `mesh` as binary STL.
///
/// Layout: 80-byte header, u32 triangle count, then per triangle a normal,
/// three vertices (all little-endian f32) and a zero u16 attribute.
/// `cancel` is polled between batches; `progress` gets a percentage after
/// each batch.
pub fn write_binary_stl(
    mesh: &RenderMesh,
    name: &str,
    cancel: Option<&AtomicBool>,
    mut progress: impl FnMut(u8),
) -> Result<Vec<u8>, ExportError> {
    let tri_count = check_indices(mesh)?;
    let mut buf = Vec::with_capacity(84 + tri_count * 50);

    let header = format!("binary STL: {name}");
    let header_bytes = header.as_bytes();
    buf.extend_from_slice(&header_bytes[..header_bytes.len().min(80)]);
    buf.resize(80, 0u8);
    buf.extend_from_slice(&(tri_count as u32).to_le_bytes());

    for (batch_index, batch) in mesh.indices.chunks(BATCH * 3).enumerate() {
        if cancel.map_or(false, |c| c.load(Ordering::Relaxed)) {
            return Err(ExportError::Cancelled);
        }
        for tri in batch.chunks_exact(3) {
            let v = [vertex(mesh, tri[0]), vertex(mesh, tri[1]), vertex(mesh, tri[2])];
            for c in facet_normal(v) {
                buf.extend_from_slice(&c.to_le_bytes());
            }
            for p in v {
                for c in p {
                    buf.extend_from_slice(&c.to_le_bytes());
                }
            }
            buf.extend_from_slice(&0u16.to_le_bytes());
        }
        let done = ((batch_index + 1) * BATCH).min(tri_count);
        progress((done * 100 / tri_count) as u8);
    }
    Ok(buf)
}

/// A running export. Dropping it does not stop the worker; call
/// [`ExportJob::cancel`] for that.
#[derive(Debug)]
pub struct ExportJob {
    pub events: Receiver<ExportEvent>,
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ExportJob {
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Block until the job ends and return its bytes.
    pub fn wait(self) -> Result<Vec<u8>, ExportError> {
        let mut outcome = Err(ExportError::WorkerLost);
        for event in self.events.iter() {
            match event {
                ExportEvent::Progress(_) => {}
                ExportEvent::Completed(bytes) => {
                    outcome = Ok(bytes);
                    break;
                }
                ExportEvent::Cancelled => {
                    outcome = Err(ExportError::Cancelled);
                    break;
                }
                ExportEvent::Failed(reason) => {
                    warn!(%reason, "export failed");
                    outcome = Err(ExportError::Failed(reason));
                    break;
                }
            }
        }
        if self.handle.join().is_err() {
            return Err(ExportError::WorkerLost);
        }
        outcome
    }
}

/// Serialize `mesh` to binary STL on a background thread.
pub fn spawn_stl_export(mesh: Arc<RenderMesh>, name: impl Into<String>) -> ExportJob {
    spawn_stl_export_with_cancel(mesh, name, Arc::new(AtomicBool::new(false)))
}

/// As [`spawn_stl_export`], with a caller-owned cancellation flag. A flag
/// that is already set cancels before the first batch.
pub fn spawn_stl_export_with_cancel(
    mesh: Arc<RenderMesh>,
    name: impl Into<String>,
    cancel: Arc<AtomicBool>,
) -> ExportJob {
    let name = name.into();
    let (tx, rx) = mpsc::channel();
    let flag = Arc::clone(&cancel);
    let handle = thread::spawn(move || run_export(&mesh, &name, &flag, &tx));
    ExportJob {
        events: rx,
        cancel,
        handle,
    }
}

fn run_export(mesh: &RenderMesh, name: &str, cancel: &AtomicBool, tx: &Sender<ExportEvent>) {
    debug!(name, triangles = mesh.triangle_count(), "stl export started");
    let result = write_binary_stl(mesh, name, Some(cancel), |pct| {
        let _ = tx.send(ExportEvent::Progress(pct));
    });
    let event = match result {
        Ok(bytes) => ExportEvent::Completed(bytes),
        Err(ExportError::Cancelled) => ExportEvent::Cancelled,
        Err(err) => ExportEvent::Failed(err.to_string()),
    };
    // The receiver may be gone; nothing left to report to.
    let _ = tx.send(event);
}
