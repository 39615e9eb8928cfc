//! The analysis crew: news analyst, price analyst and report writer
//!
//! Every request builds a fresh three-task graph. The news and price tasks
//! run first, each with its one tool; the writer gets both outputs and
//! produces the report.

use agent_core::{Agent, Context};
use agent_runtime::{AgentProfile, AgentRuntime};
use agent_tools::Tool;
use agent_workflow::{TaskGraph, TaskNode};
use async_trait::async_trait;
use minijinja::{Environment, context};
use std::sync::Arc;
use tracing::{Instrument, info};

use crate::error::Result;
use crate::symbol::Symbol;

pub const NEWS_TASK: &str = "news_analysis";
pub const PRICE_TASK: &str = "price_analysis";
pub const REPORT_TASK: &str = "write_report";

const NEWS_DESCRIPTION: &str = "Use the search tool to get news for the {{ symbol }} cryptocurrency

The current date is {{ current_date }}.

Compose the results into a helpful report";

const PRICE_DESCRIPTION: &str = "Use the price tool to get historical prices of {{ symbol }} cryptocurrency

The current date is {{ current_date }}.

Compose the results into a helpful report";

const REPORT_DESCRIPTION: &str = "Use the reports from the news analyst and the price analyst to \
create a report that summarizes the cryptocurrency";

const NEWS_EXPECTED: &str = "Create 1 paragraph report for the cryptocurrency, \
along with a prediction for the future trend";

const PRICE_EXPECTED: &str = "Create 1 paragraph summary for the cryptocurrency, \
along with a prediction for the future trend";

const REPORT_EXPECTED: &str = "1 paragraph report that summarizes the market and \
predicts the future prices (trend) for the cryptocurrency";

pub fn news_analyst_profile() -> AgentProfile {
    AgentProfile::new(
        "Cryptocurrency News Analyst",
        "Get news for a given cryptocurrency. Write 1 paragraph analysis of \
         the market and make prediction - up, down or neutral.",
        "You're an expert analyst of trends based on cryptocurrency news. \
         You have a complete understanding of macroeconomic factors, but you specialize \
         into analyzing news.",
    )
}

pub fn price_analyst_profile() -> AgentProfile {
    AgentProfile::new(
        "Cryptocurrency Price Analyst",
        "Get historical prices for a User given cryptocurrency. Write 1 paragraph analysis of \
         the market and make prediction - up, down or neutral.",
        "You're an expert analyst of trends based on cryptocurrency \
         historical prices. You have a complete understanding of macroeconomic factors, \
         but you specialize into technical analys based on historical prices.",
    )
}

pub fn writer_profile() -> AgentProfile {
    AgentProfile::new(
        "Cryptocurrency Report Writer",
        "Write 1 paragraph report of the Specific cryptocurrency market Provided by User.",
        "You're widely accepted as the best cryptocurrency analyst that \
understands the market and have tracked every asset for more than 10 years. Your trends \
analysis are always extremely accurate.

You're also master level analyst in the traditional markets and have deep understanding \
of human psychology. You understand macro factors and combine those multiple \
theories - e.g. cycle theory. You're able to hold multiple opininons when analysing anything.

You understand news and historical prices, but you look at those with a \
healthy dose of skepticism. You also consider the source of news articles.

Your most well developed talent is providing clear and concise summarization \
that explains very complex market topics in simple to understand terms.

Some of your writing techniques include:

- Creating a bullet list (executive summary) of the most importannt points
- Distill complex analyses to their most important parts

You writing transforms even dry and most technical texts into \
a pleasant and interesting read.",
    )
}

/// Produces the final report for a symbol
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn final_summary(&self, symbol: &Symbol) -> Result<String>;
}

/// The three agents and the task templates they work from
pub struct AnalysisCrew {
    news_analyst: Arc<dyn Agent>,
    price_analyst: Arc<dyn Agent>,
    writer: Arc<dyn Agent>,
    templates: Environment<'static>,
}

impl AnalysisCrew {
    /// Create the crew's agents from a runtime
    ///
    /// The news analyst gets `search`, the price analyst gets `price`, the
    /// writer works from context only.
    pub fn new(
        runtime: &AgentRuntime,
        search: Arc<dyn Tool>,
        price: Arc<dyn Tool>,
        max_iterations: usize,
    ) -> Result<Self> {
        let news_analyst = runtime.create_role_agent(
            news_analyst_profile().with_max_iterations(max_iterations),
            Some(search),
        )?;
        let price_analyst = runtime.create_role_agent(
            price_analyst_profile().with_max_iterations(max_iterations),
            Some(price),
        )?;
        let writer =
            runtime.create_role_agent(writer_profile().with_max_iterations(max_iterations), None)?;

        Self::from_agents(Arc::new(news_analyst), Arc::new(price_analyst), Arc::new(writer))
    }

    /// Assemble a crew from already built agents
    pub fn from_agents(
        news_analyst: Arc<dyn Agent>,
        price_analyst: Arc<dyn Agent>,
        writer: Arc<dyn Agent>,
    ) -> Result<Self> {
        let mut templates = Environment::new();
        templates.add_template(NEWS_TASK, NEWS_DESCRIPTION)?;
        templates.add_template(PRICE_TASK, PRICE_DESCRIPTION)?;

        Ok(Self {
            news_analyst,
            price_analyst,
            writer,
            templates,
        })
    }

    fn describe(&self, task: &str, symbol: &Symbol, current_date: &str) -> Result<String> {
        let rendered = self
            .templates
            .get_template(task)?
            .render(context! { symbol => symbol.as_str(), current_date => current_date })?;
        Ok(rendered)
    }

    /// Task graph for one request
    pub fn task_graph(&self, symbol: &Symbol, current_date: &str) -> Result<TaskGraph> {
        let graph = TaskGraph::builder()
            .add_task(TaskNode::new(
                NEWS_TASK,
                self.news_analyst.clone(),
                self.describe(NEWS_TASK, symbol, current_date)?,
                NEWS_EXPECTED,
            ))
            .add_task(TaskNode::new(
                PRICE_TASK,
                self.price_analyst.clone(),
                self.describe(PRICE_TASK, symbol, current_date)?,
                PRICE_EXPECTED,
            ))
            .add_task(
                TaskNode::new(
                    REPORT_TASK,
                    self.writer.clone(),
                    REPORT_DESCRIPTION,
                    REPORT_EXPECTED,
                )
                .depends_on([NEWS_TASK, PRICE_TASK]),
            )
            .build()?;
        Ok(graph)
    }
}

#[async_trait]
impl ReportGenerator for AnalysisCrew {
    async fn final_summary(&self, symbol: &Symbol) -> Result<String> {
        let current_date = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let request_id = uuid::Uuid::new_v4().to_string();
        let graph = self.task_graph(symbol, &current_date)?;

        let mut context = Context::new()
            .with_symbol(symbol.as_str())
            .with_current_date(current_date)
            .with_request_id(request_id.clone());

        let span = tracing::info_span!("crew", symbol = %symbol, request_id = %request_id);
        let report = graph.execute(&mut context).instrument(span).await?;

        info!(symbol = %symbol, request_id = %request_id, length = report.len(), "Report ready");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;
    use crate::news::{MockNewsSource, NewsFetcher, NewsRecord};
    use crate::prices::{MarketDataFetcher, MockPriceHistorySource};
    use crate::tools::{PriceTool, SearchTool};
    use agent_llm::{
        CompletionRequest, CompletionResponse, ContentBlock, LLMProvider, Message, StopReason,
        TokenUsage,
    };
    use agent_runtime::StepThrottle;
    use mockall::mock;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    mock! {
        pub Provider {}

        #[async_trait]
        impl LLMProvider for Provider {
            async fn complete(&self, request: CompletionRequest) -> agent_llm::Result<CompletionResponse>;
            fn name(&self) -> &str;
        }
    }

    type CallLog = Arc<Mutex<Vec<(String, String)>>>;

    struct RecordingAgent {
        name: &'static str,
        reply: &'static str,
        log: CallLog,
    }

    #[async_trait]
    impl Agent for RecordingAgent {
        async fn process(
            &self,
            input: String,
            _context: &mut Context,
        ) -> agent_core::Result<String> {
            self.log.lock().unwrap().push((self.name.to_string(), input));
            Ok(self.reply.to_string())
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn recording(name: &'static str, reply: &'static str, log: &CallLog) -> Arc<dyn Agent> {
        Arc::new(RecordingAgent {
            name,
            reply,
            log: log.clone(),
        })
    }

    fn text(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    fn tool_call(name: &str, input: Value) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant_blocks(vec![ContentBlock::ToolUse {
                id: format!("call_0_{name}"),
                name: name.to_string(),
                input,
            }]),
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        }
    }

    fn tools() -> (Arc<dyn Tool>, Arc<dyn Tool>) {
        let mut news = MockNewsSource::new();
        news.expect_search().returning(|_| {
            Ok(vec![NewsRecord {
                title: Some("ETF inflows hit record".into()),
                ..Default::default()
            }])
        });
        let mut prices = MockPriceHistorySource::new();
        prices.expect_daily_bars().returning(|_| Ok(Vec::new()));

        (
            Arc::new(SearchTool::new(Arc::new(NewsFetcher::new(Arc::new(news))))),
            Arc::new(PriceTool::new(Arc::new(MarketDataFetcher::new(Arc::new(prices))))),
        )
    }

    fn runtime(provider: MockProvider) -> AgentRuntime {
        AgentRuntime::builder()
            .provider(Arc::new(provider))
            .throttle(Arc::new(StepThrottle::unlimited()))
            .build()
            .unwrap()
    }

    fn is_persona(request: &CompletionRequest, role: &str) -> bool {
        request.system.as_deref().is_some_and(|s| s.contains(role))
    }

    #[test]
    fn test_descriptions_carry_symbol_and_date() {
        let log: CallLog = Arc::default();
        let crew = AnalysisCrew::from_agents(
            recording("news", "", &log),
            recording("price", "", &log),
            recording("writer", "", &log),
        )
        .unwrap();

        let news = crew
            .describe(NEWS_TASK, &Symbol::new("ETH"), "2026-10-15 09:00:00")
            .unwrap();
        assert_eq!(
            news,
            "Use the search tool to get news for the ETH cryptocurrency\n\n\
             The current date is 2026-10-15 09:00:00.\n\n\
             Compose the results into a helpful report"
        );

        let price = crew
            .describe(PRICE_TASK, &Symbol::new("ETH"), "2026-10-15")
            .unwrap();
        assert!(price.starts_with("Use the price tool to get historical prices of ETH cryptocurrency"));
    }

    #[tokio::test]
    async fn test_writer_runs_after_both_analysts() {
        let log: CallLog = Arc::default();
        let crew = AnalysisCrew::from_agents(
            recording("news", "NEWS-REPORT", &log),
            recording("price", "PRICE-REPORT", &log),
            recording("writer", "FINAL-REPORT", &log),
        )
        .unwrap();

        let report = crew.final_summary(&Symbol::new("BTC")).await.unwrap();
        assert_eq!(report, "FINAL-REPORT");

        let calls = log.lock().unwrap();
        let order: Vec<&str> = calls.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(order, vec!["news", "price", "writer"]);
        assert!(calls[0].1.contains("news for the BTC cryptocurrency"));
        assert!(calls[1].1.contains("historical prices of BTC cryptocurrency"));
        assert!(calls[2].1.contains("NEWS-REPORT"));
        assert!(calls[2].1.contains("PRICE-REPORT"));
    }

    #[test]
    fn test_graph_order() {
        let log: CallLog = Arc::default();
        let crew = AnalysisCrew::from_agents(
            recording("news", "", &log),
            recording("price", "", &log),
            recording("writer", "", &log),
        )
        .unwrap();
        let graph = crew.task_graph(&Symbol::new("SOL"), "today").unwrap();
        assert_eq!(graph.execution_order(), vec![NEWS_TASK, PRICE_TASK, REPORT_TASK]);
    }

    #[tokio::test]
    async fn test_full_pipeline_with_tools() {
        let mut provider = MockProvider::new();
        provider.expect_complete().returning(|request| {
            let answered_tool = request.messages.len() > 1;
            let reply = if is_persona(&request, "News Analyst") {
                if answered_tool {
                    text("News looks bullish.")
                } else {
                    tool_call("search_tool", json!({"symbol": "BTC"}))
                }
            } else if is_persona(&request, "Price Analyst") {
                if answered_tool {
                    text("Prices are flat.")
                } else {
                    tool_call("price_tool", json!({"symbol": "BTC"}))
                }
            } else {
                let prompt = request.messages[0].text().unwrap_or_default();
                assert!(prompt.contains("News looks bullish."));
                assert!(prompt.contains("Prices are flat."));
                assert!(request.tools.as_ref().is_none_or(Vec::is_empty));
                text("BTC: neutral to up.")
            };
            Ok(reply)
        });

        let (search, price) = tools();
        let crew = AnalysisCrew::new(&runtime(provider), search, price, 5).unwrap();
        let report = crew.final_summary(&Symbol::new("BTC")).await.unwrap();
        assert_eq!(report, "BTC: neutral to up.");
    }

    #[tokio::test]
    async fn test_iteration_overflow_fails_pipeline() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .returning(|_| Ok(tool_call("search_tool", json!({"symbol": "BTC"}))));

        let (search, price) = tools();
        let crew = AnalysisCrew::new(&runtime(provider), search, price, 2).unwrap();
        let err = crew.final_summary(&Symbol::new("BTC")).await.unwrap_err();
        assert!(matches!(
            err,
            CryptoError::Agent(agent_core::Error::IterationLimit { max_iterations: 2, .. })
        ));
    }
}
