use super::*;

/// The unit of work: upload exactly one local file to one destination key.
#[derive(Clone, Debug)]
pub struct UploadTask {
    pub source_path: PathBuf,
    pub destination_key: String,
    pub bucket: String,
    pub make_public: bool,
}

#[derive(Debug)]
pub enum TaskStatus {
    Success,
    Failure(Error),
}

/// The settled result of one task. Produced by the single-file uploader;
/// per-task errors never travel further up than this.
#[derive(Debug)]
pub struct TaskOutcome {
    pub task: UploadTask,
    pub status: TaskStatus,
    pub duration: Duration,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, TaskStatus::Success)
    }
}

/// Progress notification, one per settled task.
#[derive(Clone, Copy, Debug)]
pub struct ProgressTick {
    /// The number of this completion in the batch (completion order).
    pub seq: usize,
    pub ok: bool,
    pub duration: Duration,
}

/// Aggregated result of one batch invocation.
///
/// `success_count + failure_count` always equals the number of tasks
/// submitted; `errors` holds one line per failed task, in completion order.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<String>,
}

impl BatchResult {
    fn record(&mut self, outcome: &TaskOutcome) {
        match &outcome.status {
            TaskStatus::Success => self.success_count += 1,
            TaskStatus::Failure(e) => {
                self.failure_count += 1;
                self.errors
                    .push(format!("{}: {}", outcome.task.source_path.display(), e));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }

    pub fn all_succeeded(&self) -> bool {
        self.failure_count == 0
    }
}

/// Traverse all regular files under `src_dir`, yielding
/// `(absolute path, path relative to src_dir)` pairs. Hidden files are
/// included; directories and symlinks are not (symlinks are never
/// followed, so link cycles cannot occur). Unreadable entries are skipped.
pub fn files_recursive(src_dir: &Path) -> Result<Vec<(PathBuf, PathBuf)>, Error> {
    let meta = std::fs::metadata(src_dir).map_err(|_| Error::DirectoryNotFound {
        path: src_dir.to_owned(),
    })?;
    if !meta.is_dir() {
        return err::NotADirectory {
            path: src_dir.to_owned(),
        }
        .fail();
    }
    Ok(walkdir::WalkDir::new(src_dir)
        .into_iter()
        .filter_map(|entry| {
            entry.ok().and_then(|entry| {
                if entry.file_type().is_file() {
                    let path = entry.path().to_owned();
                    let relative = path.strip_prefix(src_dir).unwrap().to_path_buf();
                    Some((path, relative))
                } else {
                    None
                }
            })
        })
        .collect())
}

/// Map a relative path to its destination key: `prefix` prepended verbatim,
/// OS-specific separators normalized to `/`.
///
/// No collision detection is done; if two source files map to the same key
/// the later upload wins (object-store overwrite semantics).
pub fn object_key(prefix: &str, relative: &Path) -> String {
    let mut key = String::from(prefix);
    for (i, component) in relative.components().enumerate() {
        if i > 0 {
            key.push('/');
        }
        key.push_str(&component.as_os_str().to_string_lossy());
    }
    key
}

/// Materialize the full task list for a directory batch.
pub fn tasks_for_dir(
    src_dir: &Path,
    bucket: &str,
    config: &UploadConfig,
) -> Result<Vec<UploadTask>, Error> {
    Ok(files_recursive(src_dir)?
        .into_iter()
        .map(|(source_path, relative)| UploadTask {
            destination_key: object_key(&config.key_prefix, &relative),
            source_path,
            bucket: bucket.to_owned(),
            make_public: config.make_public,
        })
        .collect())
}

async fn try_upload<S: ObjectStore>(store: &S, task: &UploadTask) -> Result<(), Error> {
    // The file may have vanished since enumeration; report that as its own
    // kind rather than as a transfer failure.
    if tokio::fs::metadata(&task.source_path).await.is_err() {
        return err::LocalNotFound {
            path: task.source_path.clone(),
        }
        .fail();
    }
    store
        .put_object(&task.bucket, &task.destination_key, &task.source_path)
        .await?;
    if task.make_public {
        // "uploaded but not public" does not satisfy the request, so a
        // failed visibility change fails the whole task.
        store
            .set_public(&task.bucket, &task.destination_key)
            .await?;
    }
    Ok(())
}

/// Run one task to a settled outcome. This is the task boundary: any error
/// is caught here and becomes part of the outcome.
pub async fn upload_one<S: ObjectStore>(store: &S, task: UploadTask) -> TaskOutcome {
    let started = Instant::now();
    let status = match try_upload(store, &task).await {
        Ok(()) => TaskStatus::Success,
        Err(e) => TaskStatus::Failure(e),
    };
    TaskOutcome {
        task,
        status,
        duration: started.elapsed(),
    }
}

impl<S: ObjectStore> BatchUploader<S> {
    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool, Error> {
        self.store.bucket_exists(bucket).await
    }

    pub async fn list_buckets(&self) -> Result<Vec<String>, Error> {
        self.store.list_buckets().await
    }

    /// Upload a single file. `key` defaults to the file's name. Unlike the
    /// batch surface this propagates the specific error kind to the caller.
    pub async fn upload_file(
        &self,
        bucket: &str,
        path: &Path,
        key: Option<&str>,
    ) -> Result<(), Error> {
        let key = match key {
            Some(k) => k.to_owned(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let task = UploadTask {
            source_path: path.to_owned(),
            destination_key: key,
            bucket: bucket.to_owned(),
            make_public: self.config.make_public,
        };
        try_upload(&self.store, &task).await
    }

    /// Upload every regular file under `src_dir` to `bucket`.
    ///
    /// Preconditions (root is a directory, bucket exists) are checked before
    /// any task is dispatched. After that the batch always runs to
    /// completion: one task failing never aborts or blocks the others, and
    /// every task settles into exactly one [`TaskOutcome`].
    ///
    /// At most `config.concurrency` uploads run simultaneously. `progress`
    /// is called once per settled task (success or failure), in completion
    /// order; it is a display hook only and its cost should be bounded.
    /// No work is outstanding when this returns.
    pub async fn upload_dir<P, F>(
        &self,
        bucket: &str,
        src_dir: &Path,
        progress: P,
    ) -> Result<BatchResult, Error>
    where
        P: Fn(ProgressTick) -> F + Clone + Send + Sync + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        let tasks = tasks_for_dir(src_dir, bucket, &self.config)?;
        if !self.store.bucket_exists(bucket).await? {
            return err::BucketNotFound {
                bucket: bucket.to_owned(),
            }
            .fail();
        }
        if tasks.is_empty() {
            warn!(dir = %src_dir.display(), "no files found in directory");
            return Ok(BatchResult::default());
        }

        let concurrency = self.config.concurrency.max(1);
        info!(
            files = tasks.len(),
            bucket,
            concurrency,
            "starting batch upload"
        );

        let jobs = tasks.into_iter().map(|task| {
            let store = self.store.clone();
            async move { upload_one(&store, task).await }
        });

        // Completions arrive on this single consumer, which is the only
        // writer of the batch result.
        let mut outcomes = stream::iter(jobs)
            .buffer_unordered(concurrency)
            .zip(stream::iter(0..));
        let mut result = BatchResult::default();
        while let Some((outcome, seq)) = outcomes.next().await {
            progress(ProgressTick {
                seq,
                ok: outcome.is_success(),
                duration: outcome.duration,
            })
            .await;
            match &outcome.status {
                TaskStatus::Success => debug!(
                    key = %outcome.task.destination_key,
                    ms = outcome.duration.as_millis() as u64,
                    "uploaded"
                ),
                TaskStatus::Failure(e) => warn!(
                    path = %outcome.task.source_path.display(),
                    error = %e,
                    "upload failed"
                ),
            }
            result.record(&outcome);
        }

        info!(
            success = result.success_count,
            failed = result.failure_count,
            "batch upload complete"
        );
        Ok(result)
    }
}
