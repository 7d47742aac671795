pub mod conversation;
pub mod dispatch;
pub mod event;
pub mod framer;
pub mod functions;
pub mod tokens;
pub mod upstream;

use crate::error::AppError;
use crate::faq::FaqStore;
use conversation::{Conversation, Message, Role};
use dispatch::FunctionOutcome;
use event::StreamEvent;
use framer::LineStream;
use functions::{FaqCall, FaqFunction, FunctionCallRecord};
use tokens::TokenUsage;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use upstream::UpstreamClient;

const FRAGMENT_BUFFER: usize = 64;

const FAQ_CONTEXT_HEADER: &str = "Encontrei algumas respostas relevantes na nossa FAQ. Por favor, priorize essas informações na sua resposta:\n\n";
const FAQ_FALLBACK: &str = "Não encontrei respostas específicas na nossa FAQ para esta pergunta. Por favor, forneça uma resposta genérica, mas sugira que o usuário faça perguntas mais específicas se precisar de informações detalhadas.";

/// Ordered channel of text fragments toward the caller. The last item is an
/// `Err` when the relay ended abnormally.
pub struct FragmentSink {
    tx: mpsc::Sender<Result<String, AppError>>,
}

impl FragmentSink {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Result<String, AppError>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub async fn send(&self, fragment: String) -> Result<(), AppError> {
        self.tx
            .send(Ok(fragment))
            .await
            .map_err(|_| AppError::ClientGone)
    }

    pub async fn fail(&self, error: AppError) {
        if self.tx.send(Err(error)).await.is_err() {
            log::debug!("Client already gone, dropping relay error");
        }
    }
}

/// Shared entry point: one per process, cloned into every request.
#[derive(Clone)]
pub struct Relay {
    store: FaqStore,
    upstream: UpstreamClient,
}

impl Relay {
    pub fn new(store: FaqStore, upstream: UpstreamClient) -> Self {
        Self { store, upstream }
    }

    pub fn store(&self) -> &FaqStore {
        &self.store
    }

    /// Count input tokens, add FAQ context and open the first upstream stream.
    /// Errors here happen before any fragment is produced.
    pub async fn open(&self, messages: Vec<Message>) -> Result<RelaySession, AppError> {
        if !self.upstream.has_api_key() {
            log::error!("OPENAI_API_KEY is not configured");
            return Err(AppError::MissingApiKey);
        }

        let mut conversation = Conversation::new(messages);
        let usage = TokenUsage {
            input: tokens::estimate_conversation(conversation.messages()),
            output: 0,
        };

        self.inject_faq_context(&mut conversation).await;

        let lines = self
            .upstream
            .stream_completion(conversation.messages(), true)
            .await?;

        Ok(RelaySession {
            relay: self.clone(),
            conversation,
            lines,
            usage,
        })
    }

    async fn inject_faq_context(&self, conversation: &mut Conversation) {
        let query = match conversation.last() {
            Some(last) if last.role == Role::User => last.content.clone().unwrap_or_default(),
            _ => return,
        };

        match self.store.search(&query, None).await {
            Ok(matches) if !matches.is_empty() => {
                log::info!("FAQ context: {} matching entries", matches.len());
                let pairs = matches
                    .iter()
                    .map(|m| format!("Pergunta: {}\nResposta: {}", m.faq.question, m.faq.answer))
                    .collect::<Vec<_>>()
                    .join("\n\n");
                conversation.push_system(format!("{}{}", FAQ_CONTEXT_HEADER, pairs));
            }
            Ok(_) => {
                log::info!("FAQ context: no matching entries");
                conversation.push_system(FAQ_FALLBACK);
            }
            Err(e) => log::error!("FAQ search failed, continuing without context: {}", e),
        }
    }

    /// Execute a completed call, report it, and relay the model's follow-up.
    async fn complete_call(
        &self,
        call: CallAccumulator,
        conversation: &mut Conversation,
        usage: &mut TokenUsage,
        sink: &FragmentSink,
    ) -> Result<(), AppError> {
        let Some(function) = FaqFunction::from_name(&call.name) else {
            log::warn!(
                "Ignoring call to unknown function '{}' ({} bytes of arguments)",
                call.name,
                call.arguments.len()
            );
            return Ok(());
        };

        conversation.push_function_call(&call.name, &call.arguments);

        let parsed = FunctionCallRecord::parse(&call.name, &call.arguments)
            .and_then(|record| FaqCall::from_record(function, &record));
        let outcome = match parsed {
            Ok(faq_call) => {
                log::info!("Executing function {}", call.name);
                dispatch::execute(faq_call, &self.store).await
            }
            Err(e) => {
                log::warn!("Invalid arguments for {}: {} ({})", call.name, e, call.arguments);
                FunctionOutcome::from_error(&call.name, &e)
            }
        };

        if !outcome.is_success() {
            log::warn!("Function {} failed", call.name);
        }
        if let Some(fragment) = outcome.record(&call.name, conversation) {
            sink.send(fragment).await?;
        }

        self.follow_up(function, conversation, usage, sink).await
    }

    async fn follow_up(
        &self,
        function: FaqFunction,
        conversation: &mut Conversation,
        usage: &mut TokenUsage,
        sink: &FragmentSink,
    ) -> Result<(), AppError> {
        let mut lines = self
            .upstream
            .stream_completion(conversation.messages(), false)
            .await?;

        let mut reply = String::new();
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::error!("Follow-up stream for {} broke: {}", function.as_str(), e);
                    sink.send(format!(
                        "Erro ao executar função {}: {}\n",
                        function.as_str(),
                        e
                    ))
                    .await?;
                    break;
                }
            };
            match event::decode_line(&line) {
                Some(StreamEvent::Content(text)) => {
                    usage.output += tokens::estimate_tokens(&text);
                    reply.push_str(&text);
                    sink.send(text).await?;
                }
                Some(other) => log::debug!("Ignoring non-content event in follow-up: {:?}", other),
                None => {}
            }
        }

        if !reply.is_empty() {
            conversation.push_assistant(reply);
        }
        Ok(())
    }
}

/// Function call being assembled from stream fragments.
#[derive(Debug, Default)]
struct CallAccumulator {
    name: String,
    arguments: String,
}

/// One request's relay, ready to produce fragments.
pub struct RelaySession {
    relay: Relay,
    conversation: Conversation,
    lines: LineStream,
    usage: TokenUsage,
}

impl RelaySession {
    pub fn tokens_in(&self) -> u64 {
        self.usage.input
    }

    /// Drive the session to completion, forwarding fragments in order.
    /// Returns the final conversation.
    pub async fn run(self, sink: &FragmentSink) -> Result<Conversation, AppError> {
        let RelaySession {
            relay,
            mut conversation,
            mut lines,
            mut usage,
        } = self;
        let mut pending: Option<CallAccumulator> = None;

        while let Some(line) = lines.next().await {
            let line = line?;
            let complete = match event::decode_line(&line) {
                None => false,
                Some(StreamEvent::Content(text)) => {
                    usage.output += tokens::estimate_tokens(&text);
                    sink.send(text).await?;
                    false
                }
                Some(StreamEvent::FunctionCall {
                    name,
                    arguments,
                    finished,
                }) => {
                    if let Some(name) = name {
                        log::debug!("Function call started: {}", name);
                        pending = Some(CallAccumulator {
                            name,
                            arguments: String::new(),
                        });
                    }
                    let mut complete = finished;
                    if let Some(fragment) = arguments {
                        complete |= fragment.ends_with('}');
                        pending
                            .get_or_insert_with(CallAccumulator::default)
                            .arguments
                            .push_str(&fragment);
                    }
                    complete
                }
                Some(StreamEvent::FunctionCallFinished) => true,
            };

            if complete {
                if let Some(call) = pending.take() {
                    relay
                        .complete_call(call, &mut conversation, &mut usage, sink)
                        .await?;
                }
            }
        }

        log::info!(
            "Relay finished: {} tokens in, {} tokens out, {} messages",
            usage.input,
            usage.output,
            conversation.len()
        );
        Ok(conversation)
    }

    /// Run on a background task and expose the fragments as a stream.
    pub fn spawn(self) -> ReceiverStream<Result<String, AppError>> {
        let (sink, rx) = FragmentSink::channel(FRAGMENT_BUFFER);
        tokio::spawn(async move {
            match self.run(&sink).await {
                Ok(_) => {}
                Err(AppError::ClientGone) => log::info!("Client disconnected, relay stopped"),
                Err(e) => {
                    log::error!("Relay failed: {}", e);
                    sink.fail(e).await;
                }
            }
        });
        ReceiverStream::new(rx)
    }
}
